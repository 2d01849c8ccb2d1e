//! Hoosat API sources: price, hashrate, market cap and address balances

use crate::{
    constants::{HASHRATE_ENDPOINT, MARKETCAP_ENDPOINT, PRICE_ENDPOINT, SOMPI_PER_HTN},
    error::FetchError,
    source::{get_json, AddressBalance, MetricSource},
    types::MetricKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

/// Client for the configured Hoosat API
///
/// With no base URL every call fails with `NotConfigured`, which the
/// sources report as unavailable.
pub struct HoosatApi {
    client: Client,
    base_url: Option<String>,
}

impl HoosatApi {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        let base_url = base_url.map(|url| url.trim().trim_end_matches('/').to_string());
        Self { client, base_url }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path: &str) -> Result<String, FetchError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(FetchError::NotConfigured("API_URL"))?;
        Ok(format!("{}{}", base, path))
    }

    async fn fetch_field(&self, path: &str, field: &'static str) -> Result<f64, FetchError> {
        let url = self.url(path)?;
        let body: Value = get_json(&self.client, &url).await?;
        number_field(&body, field)
    }

    /// HTN price in USDT
    pub async fn price(&self) -> Result<f64, FetchError> {
        self.fetch_field(PRICE_ENDPOINT, "price").await
    }

    /// Network hashrate in TH/s
    pub async fn hashrate(&self) -> Result<f64, FetchError> {
        self.fetch_field(HASHRATE_ENDPOINT, "hashrate").await
    }

    /// Market capitalization in USDT
    pub async fn marketcap(&self) -> Result<f64, FetchError> {
        self.fetch_field(MARKETCAP_ENDPOINT, "marketcap").await
    }

    /// Balance of `address` in HTN
    pub async fn address_balance(&self, address: &str) -> Result<f64, FetchError> {
        if !is_hoosat_address(address) {
            return Err(FetchError::invalid(format!("not a hoosat address: {:?}", address)));
        }
        let sompi = self
            .fetch_field(&format!("/addresses/{}/balance", address), "balance")
            .await?;
        Ok(sompi / SOMPI_PER_HTN)
    }
}

#[async_trait]
impl AddressBalance for HoosatApi {
    async fn try_balance_of(&self, address: &str) -> Result<f64, FetchError> {
        self.address_balance(address).await
    }
}

/// Reads a numeric field that may be encoded as a number or a numeric string
pub(crate) fn number_field(body: &Value, field: &'static str) -> Result<f64, FetchError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(FetchError::MissingField(field)),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| FetchError::invalid(format!("{} is not representable: {}", field, n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FetchError::invalid(format!("{} is not numeric: {:?}", field, s))),
        Some(other) => Err(FetchError::invalid(format!(
            "{} is not numeric: {}",
            field, other
        ))),
    }
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Price,
    Hashrate,
    MarketCap,
}

/// One of the network-wide Hoosat metrics
pub struct HoosatMetric {
    api: Arc<HoosatApi>,
    endpoint: Endpoint,
}

impl HoosatMetric {
    pub fn price(api: Arc<HoosatApi>) -> Self {
        Self { api, endpoint: Endpoint::Price }
    }

    pub fn hashrate(api: Arc<HoosatApi>) -> Self {
        Self { api, endpoint: Endpoint::Hashrate }
    }

    pub fn marketcap(api: Arc<HoosatApi>) -> Self {
        Self { api, endpoint: Endpoint::MarketCap }
    }
}

#[async_trait]
impl MetricSource for HoosatMetric {
    fn kind(&self) -> MetricKind {
        match self.endpoint {
            Endpoint::Price => MetricKind::Price,
            Endpoint::Hashrate => MetricKind::Hashrate,
            Endpoint::MarketCap => MetricKind::MarketCap,
        }
    }

    async fn try_fetch(&self) -> Result<f64, FetchError> {
        match self.endpoint {
            Endpoint::Price => self.api.price().await,
            Endpoint::Hashrate => self.api.hashrate().await,
            Endpoint::MarketCap => self.api.marketcap().await,
        }
    }
}

/// HTN balance of a fixed wallet
pub struct HoosatWallet {
    api: Arc<HoosatApi>,
    address: String,
}

impl HoosatWallet {
    pub fn new(api: Arc<HoosatApi>, address: impl Into<String>) -> Self {
        Self {
            api,
            address: address.into(),
        }
    }
}

#[async_trait]
impl MetricSource for HoosatWallet {
    fn kind(&self) -> MetricKind {
        MetricKind::HtnWallet
    }

    async fn try_fetch(&self) -> Result<f64, FetchError> {
        self.api.address_balance(&self.address).await
    }
}

/// True for a trimmed `hoosat:` address followed by a non-empty bech32 payload
///
/// Only lowercase letters and digits may follow the prefix, so the address
/// always stays a single URL path segment.
pub fn is_hoosat_address(address: &str) -> bool {
    address
        .trim()
        .strip_prefix(crate::constants::HOOSAT_ADDRESS_PREFIX)
        .is_some_and(|rest| {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}
