use std::sync::Arc;

use anyhow::Context;
use chainchat::{
    config::{Config, OracleUrls},
    ledger::Ledger,
    oracle::{HttpOracle, PriceFeed, PriceOracle, StaticOracle},
    AppState,
};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;
    let ledger = Ledger::open(db_pool, config.policy, config.event_capacity).await?;

    let prices = price_feed(&config.oracles).with_max_age(config.price_max_age);
    let app_state = AppState {
        ledger: Arc::new(ledger),
        prices: Arc::new(prices),
    };

    let app = chainchat::app(app_state, time::Duration::minutes(config.session_idle_minutes));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(address = %config.bind_addr, "chainchat listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn price_feed(urls: &OracleUrls) -> PriceFeed {
    let http_client = reqwest::Client::new();
    let oracle = |feed: &str, url: &Option<String>| -> Box<dyn PriceOracle> {
        match url {
            Some(url) => Box::new(HttpOracle::new(feed, url.as_str(), http_client.clone())),
            None => {
                warn!(feed, "no oracle url configured, answering 0");
                Box::new(StaticOracle::new(feed, 0, 0))
            }
        }
    };

    PriceFeed::new(
        oracle("BTC/USD", &urls.btc_usd),
        oracle("ETH/USD", &urls.eth_usd),
        oracle("LINK/USD", &urls.link_usd),
    )
}
