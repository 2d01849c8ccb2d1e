//! TRC20 token balance source backed by the TronGrid public API

use crate::{
    constants::{TRC20_USDT_UNITS, TRONGRID_API_URL, TRON_USDT_CONTRACT},
    error::FetchError,
    source::{get_json, MetricSource},
    types::MetricKind,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// TronGrid `/v1/accounts/{address}` response
#[derive(Debug, Deserialize)]
struct AccountsResponse {
    data: Vec<AccountRecord>,
}

#[derive(Debug, Deserialize)]
struct AccountRecord {
    /// One single-key map per token: contract address -> raw balance
    #[serde(default)]
    trc20: Vec<HashMap<String, Value>>,
}

/// TRC20 USDT balance of a TRON address
///
/// An account that exists but holds no entry for the contract has a balance
/// of exactly zero. An account that cannot be read is unavailable.
pub struct TronTokenBalance {
    client: Client,
    base_url: String,
    address: String,
    contract: String,
}

impl TronTokenBalance {
    /// USDT balance of `address` via the public TronGrid endpoint
    pub fn usdt(client: Client, address: impl Into<String>) -> Self {
        Self::with_base_url(client, TRONGRID_API_URL, address)
    }

    /// Same as [`usdt`](Self::usdt) against another accounts endpoint
    pub fn with_base_url(
        client: Client,
        base_url: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            address: address.into(),
            contract: TRON_USDT_CONTRACT.to_string(),
        }
    }

    fn parse_balance(&self, response: AccountsResponse) -> Result<f64, FetchError> {
        let account = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::invalid(format!("no account record for {}", self.address)))?;

        let raw = match account
            .trc20
            .iter()
            .find_map(|token| token.get(&self.contract))
        {
            Some(raw) => raw,
            None => return Ok(0.0),
        };

        let units = match raw {
            Value::String(s) => s.trim().parse::<u128>().ok().map(|v| v as f64),
            Value::Number(n) => n.as_u64().map(|v| v as f64),
            _ => None,
        }
        .ok_or_else(|| FetchError::invalid(format!("token balance is not an integer: {}", raw)))?;

        Ok(units / TRC20_USDT_UNITS)
    }
}

#[async_trait]
impl MetricSource for TronTokenBalance {
    fn kind(&self) -> MetricKind {
        MetricKind::UsdtWallet
    }

    async fn try_fetch(&self) -> Result<f64, FetchError> {
        let url = format!("{}/{}", self.base_url, self.address);
        let response: AccountsResponse = get_json(&self.client, &url).await?;
        self.parse_balance(response)
    }
}
