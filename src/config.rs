use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::ledger::{LedgerPolicy, SameNamePolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub event_capacity: usize,
    pub session_idle_minutes: i64,
    pub policy: LedgerPolicy,
    pub oracles: OracleUrls,
    pub price_max_age: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct OracleUrls {
    pub btc_usd: Option<String>,
    pub eth_usd: Option<String>,
    pub link_usd: Option<String>,
}

impl Config {
    /// Reads settings from the process environment and `.env`.
    pub fn from_env() -> anyhow::Result<Config> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let parse_bool = |key: &str, default: bool| -> anyhow::Result<bool> {
            match var(key).as_deref() {
                None => Ok(default),
                Some("1" | "true" | "yes") => Ok(true),
                Some("0" | "false" | "no") => Ok(false),
                Some(other) => Err(anyhow!("{key}: expected a boolean, got {other:?}")),
            }
        };

        let same_name = match var("SAME_NAME_POLICY").as_deref() {
            None | Some("accept") => SameNamePolicy::Accept,
            Some("reject") => SameNamePolicy::Reject,
            Some(other) => return Err(anyhow!("SAME_NAME_POLICY: expected accept or reject, got {other:?}")),
        };

        let price_max_age = var("PRICE_MAX_AGE_SECS")
            .map(|secs| secs.parse::<u64>().map(Duration::from_secs))
            .transpose()
            .context("PRICE_MAX_AGE_SECS")?;

        Ok(Config {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite://chainchat.db?mode=rwc".to_owned()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_owned()),
            event_capacity: var("EVENT_CAPACITY")
                .map(|n| n.parse::<usize>())
                .transpose()
                .context("EVENT_CAPACITY")?
                .unwrap_or(256),
            session_idle_minutes: var("SESSION_IDLE_MINUTES")
                .map(|n| n.parse::<i64>())
                .transpose()
                .context("SESSION_IDLE_MINUTES")?
                .unwrap_or(60),
            policy: LedgerPolicy {
                allow_self_messages: parse_bool("ALLOW_SELF_MESSAGES", true)?,
                same_name,
            },
            oracles: OracleUrls {
                btc_usd: var("ORACLE_BTC_USD_URL"),
                eth_usd: var("ORACLE_ETH_USD_URL"),
                link_usd: var("ORACLE_LINK_USD_URL"),
            },
            price_max_age,
        })
    }
}
