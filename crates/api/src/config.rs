//! Process configuration read from the environment.
//!
//! | Variable              | Default        |
//! |-----------------------|----------------|
//! | `PROTELAB_BIND_ADDR`  | `0.0.0.0:8080` |
//! | `PROTELAB_SEED_DEMO`  | `true`         |
//! | `PROTELAB_LOG_FORMAT` | `json`         |
//!
//! `RUST_LOG` controls filtering, see `protelab-observability`.

use std::net::SocketAddr;

use anyhow::{Context, bail};

use protelab_observability::LogFormat;

pub const BIND_ADDR_VAR: &str = "PROTELAB_BIND_ADDR";
pub const SEED_DEMO_VAR: &str = "PROTELAB_SEED_DEMO";
pub const LOG_FORMAT_VAR: &str = "PROTELAB_LOG_FORMAT";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Load the demo labs and offerings at startup.
    pub seed_demo: bool,
    pub log_format: LogFormat,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Unset or blank keys take
    /// their default; malformed values are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = value(BIND_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .trim()
            .parse::<SocketAddr>()
            .with_context(|| format!("{BIND_ADDR_VAR} must be a socket address like 0.0.0.0:8080"))?;

        let seed_demo = match value(SEED_DEMO_VAR) {
            Some(raw) => parse_bool(&raw).with_context(|| format!("invalid {SEED_DEMO_VAR}"))?,
            None => true,
        };

        let log_format = match value(LOG_FORMAT_VAR) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {LOG_FORMAT_VAR}"))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            seed_demo,
            log_format,
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            seed_demo: true,
            log_format: LogFormat::default(),
        }
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}
