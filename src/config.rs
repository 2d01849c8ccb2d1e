//! Environment configuration
//!
//! Only `TOKEN` is required. Every other variable enables or tunes a feature;
//! leaving it unset (or blank) disables that feature.

use crate::{constants::REFRESH_INTERVAL_SECS, error::ConfigError, types::ChannelId};
use std::time::Duration;

/// Output channel ids, one per published metric
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    pub price: Option<ChannelId>,
    pub hashrate: Option<ChannelId>,
    pub marketcap: Option<ChannelId>,
    pub htn_wallet: Option<ChannelId>,
    pub usdt_wallet: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub token: String,
    /// Hoosat API base URL
    pub api_url: Option<String>,
    pub channels: ChannelConfig,
    /// Restricts command registration to one guild
    pub guild_id: Option<u64>,
    pub log_level: String,
    pub log_format: String,
    pub refresh_interval: Duration,
}

impl Config {
    /// Reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let integer = |name: &'static str| -> Result<Option<u64>, ConfigError> {
            match text(name) {
                None => Ok(None),
                Some(value) => value
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidInteger { name, value }),
            }
        };
        let channel = |name: &'static str| integer(name).map(|id| id.map(ChannelId));

        let token = text("TOKEN").ok_or(ConfigError::MissingToken)?;

        let refresh_secs = integer("REFRESH_INTERVAL_SECS")?
            .filter(|secs| *secs > 0)
            .unwrap_or(REFRESH_INTERVAL_SECS);

        Ok(Self {
            token,
            api_url: text("API_URL"),
            channels: ChannelConfig {
                price: channel("PRICE_CHANNEL_ID")?,
                hashrate: channel("HASHRATE_CHANNEL_ID")?,
                marketcap: channel("MARKETCAP_CHANNEL_ID")?,
                htn_wallet: channel("HOOSAT_LISTING_WALLET_CHANNEL")?,
                usdt_wallet: channel("TRON_USDT_LISTING_WALLET_CHANNEL")?,
            },
            guild_id: integer("GUILD_ID")?,
            log_level: text("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: text("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            refresh_interval: Duration::from_secs(refresh_secs),
        })
    }
}
