//! Price feed over three external oracles (BTC/USD, ETH/USD, LINK/USD).
//!
//! Answers are passed through verbatim: signed fixed-point values with
//! [`PRICE_DECIMALS`] decimals. Nothing is cached or retried here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;

pub const PRICE_DECIMALS: u8 = 8;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("{feed} oracle unavailable: {reason}")]
    Unavailable { feed: String, reason: String },

    #[error("{feed} answer is {age}s old")]
    Stale { feed: String, age: i64 },

    #[error("{feed} oracle returned a malformed answer: {reason}")]
    Malformed { feed: String, reason: String },
}

/// One oracle reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RoundData {
    pub answer: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Feed name used in logs and errors, e.g. `BTC/USD`.
    fn feed(&self) -> &str;

    async fn latest_round(&self) -> Result<RoundData, OracleError>;
}

/// Reads `{"answer": .., "updatedAt": ..}` from a JSON endpoint.
pub struct HttpOracle {
    feed: String,
    url: String,
    http_client: reqwest::Client,
}

impl HttpOracle {
    pub fn new(feed: impl Into<String>, url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            feed: feed.into(),
            url: url.into(),
            http_client,
        }
    }
}

#[async_trait]
impl PriceOracle for HttpOracle {
    fn feed(&self) -> &str {
        &self.feed
    }

    async fn latest_round(&self) -> Result<RoundData, OracleError> {
        let unavailable = |err: reqwest::Error| OracleError::Unavailable {
            feed: self.feed.clone(),
            reason: err.to_string(),
        };

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unavailable)?;

        response.json().await.map_err(|err| OracleError::Malformed {
            feed: self.feed.clone(),
            reason: err.to_string(),
        })
    }
}

/// Always answers with the same reading.
pub struct StaticOracle {
    feed: String,
    round: RoundData,
}

impl StaticOracle {
    pub fn new(feed: impl Into<String>, answer: i64, updated_at: i64) -> Self {
        Self {
            feed: feed.into(),
            round: RoundData { answer, updated_at },
        }
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    fn feed(&self) -> &str {
        &self.feed
    }

    async fn latest_round(&self) -> Result<RoundData, OracleError> {
        Ok(self.round)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prices {
    pub btc_usd: i64,
    pub eth_usd: i64,
    pub link_usd: i64,
    pub decimals: u8,
}

pub struct PriceFeed {
    btc_usd: Box<dyn PriceOracle>,
    eth_usd: Box<dyn PriceOracle>,
    link_usd: Box<dyn PriceOracle>,
    max_age: Option<Duration>,
}

impl PriceFeed {
    pub fn new(btc_usd: Box<dyn PriceOracle>, eth_usd: Box<dyn PriceOracle>, link_usd: Box<dyn PriceOracle>) -> Self {
        Self {
            btc_usd,
            eth_usd,
            link_usd,
            max_age: None,
        }
    }

    /// Rejects answers whose `updatedAt` is older than `max_age`.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Queries all three oracles concurrently. The first failure wins.
    pub async fn get_all_prices(&self) -> Result<Prices, OracleError> {
        let (btc, eth, link) = tokio::try_join!(
            self.read(self.btc_usd.as_ref()),
            self.read(self.eth_usd.as_ref()),
            self.read(self.link_usd.as_ref()),
        )?;

        Ok(Prices {
            btc_usd: btc,
            eth_usd: eth,
            link_usd: link,
            decimals: PRICE_DECIMALS,
        })
    }

    async fn read(&self, oracle: &dyn PriceOracle) -> Result<i64, OracleError> {
        let round = oracle.latest_round().await.inspect_err(|err| {
            warn!(feed = oracle.feed(), %err, "oracle lookup failed");
        })?;

        if let Some(max_age) = self.max_age {
            let age = OffsetDateTime::now_utc().unix_timestamp().saturating_sub(round.updated_at);
            if age > i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX) {
                warn!(feed = oracle.feed(), age, "oracle answer is stale");
                return Err(OracleError::Stale {
                    feed: oracle.feed().to_owned(),
                    age,
                });
            }
        }

        Ok(round.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DownOracle;

    #[async_trait]
    impl PriceOracle for DownOracle {
        fn feed(&self) -> &str {
            "ETH/USD"
        }

        async fn latest_round(&self) -> Result<RoundData, OracleError> {
            Err(OracleError::Unavailable {
                feed: "ETH/USD".to_owned(),
                reason: "sequencer down".to_owned(),
            })
        }
    }

    fn now() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    #[tokio::test]
    async fn passes_answers_through() {
        let feed = PriceFeed::new(
            Box::new(StaticOracle::new("BTC/USD", 6_512_345_000_000, 0)),
            Box::new(StaticOracle::new("ETH/USD", 312_000_000_000, 0)),
            Box::new(StaticOracle::new("LINK/USD", -1, 0)),
        );

        let prices = feed.get_all_prices().await.unwrap();
        assert_eq!(prices, Prices {
            btc_usd: 6_512_345_000_000,
            eth_usd: 312_000_000_000,
            link_usd: -1,
            decimals: 8,
        });
    }

    #[tokio::test]
    async fn surfaces_oracle_failure() {
        let feed = PriceFeed::new(
            Box::new(StaticOracle::new("BTC/USD", 1, 0)),
            Box::new(DownOracle),
            Box::new(StaticOracle::new("LINK/USD", 1, 0)),
        );

        let err = feed.get_all_prices().await.unwrap_err();
        assert!(matches!(err, OracleError::Unavailable { feed, .. } if feed == "ETH/USD"));
    }

    #[tokio::test]
    async fn staleness_bound_is_opt_in() {
        let feed = PriceFeed::new(
            Box::new(StaticOracle::new("BTC/USD", 1, now())),
            Box::new(StaticOracle::new("ETH/USD", 2, now())),
            Box::new(StaticOracle::new("LINK/USD", 3, now() - 7200)),
        );
        assert!(feed.get_all_prices().await.is_ok());

        let feed = feed.with_max_age(Some(Duration::from_secs(3600)));
        let err = feed.get_all_prices().await.unwrap_err();
        assert!(matches!(err, OracleError::Stale { feed, age } if feed == "LINK/USD" && age >= 7200));
    }

    #[tokio::test]
    async fn extreme_timestamps_do_not_overflow() {
        let feed = PriceFeed::new(
            Box::new(StaticOracle::new("BTC/USD", 1, i64::MIN)),
            Box::new(StaticOracle::new("ETH/USD", 2, now())),
            Box::new(StaticOracle::new("LINK/USD", 3, now())),
        )
        .with_max_age(Some(Duration::from_secs(60)));
        let err = feed.get_all_prices().await.unwrap_err();
        assert!(matches!(err, OracleError::Stale { feed, age } if feed == "BTC/USD" && age == i64::MAX));

        let feed = PriceFeed::new(
            Box::new(StaticOracle::new("BTC/USD", 1, now())),
            Box::new(StaticOracle::new("ETH/USD", 2, i64::MAX)),
            Box::new(StaticOracle::new("LINK/USD", 3, now())),
        )
        .with_max_age(Some(Duration::from_secs(60)));
        assert!(feed.get_all_prices().await.is_ok());
    }

    #[tokio::test]
    async fn huge_max_age_accepts_fresh_answers() {
        let feed = PriceFeed::new(
            Box::new(StaticOracle::new("BTC/USD", 1, now())),
            Box::new(StaticOracle::new("ETH/USD", 2, now())),
            Box::new(StaticOracle::new("LINK/USD", 3, 0)),
        )
        .with_max_age(Some(Duration::from_secs(u64::MAX)));
        assert_eq!(feed.get_all_prices().await.unwrap().btc_usd, 1);
    }

    #[test]
    fn round_data_uses_oracle_field_names() {
        let round: RoundData = serde_json::from_str(r#"{"answer": 4200000000, "updatedAt": 17}"#).unwrap();
        assert_eq!(round, RoundData { answer: 4_200_000_000, updated_at: 17 });
    }
}
