//! Metric source abstraction and the shared HTTP client

use crate::{
    constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::FetchError,
    types::{MetricKind, MetricValue},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Builds the HTTP client shared by every source
///
/// One client (and connection pool) is created at startup and cloned into
/// each source; clones share the pool.
pub fn build_http_client() -> Result<Client, FetchError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(FetchError::Network)
}

/// GETs `url` and decodes the JSON body
///
/// Non-2xx statuses and undecodable bodies are errors.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
) -> Result<T, FetchError> {
    tracing::debug!(url, "Fetching");

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status()));
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| FetchError::invalid(format!("{}. Response: {}", e, body)))
}

/// Trait for anything that can produce one metric value
///
/// Implementations only need `try_fetch`; callers use `fetch`, which never
/// fails and logs the reason a value is unavailable.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Which metric this source produces
    fn kind(&self) -> MetricKind;

    /// Performs the request, surfacing any failure
    async fn try_fetch(&self) -> Result<f64, FetchError>;

    /// Performs the request, turning any failure into `Unavailable`
    async fn fetch(&self) -> MetricValue {
        match self.try_fetch().await {
            Ok(value) => MetricValue::Present(value),
            Err(e) => {
                tracing::warn!(metric = %self.kind(), error = %e, "Metric fetch failed");
                MetricValue::Unavailable
            }
        }
    }
}

/// Balance lookup for an arbitrary Hoosat address
#[async_trait]
pub trait AddressBalance: Send + Sync {
    /// HTN balance of `address`
    async fn try_balance_of(&self, address: &str) -> Result<f64, FetchError>;

    async fn balance_of(&self, address: &str) -> MetricValue {
        match self.try_balance_of(address).await {
            Ok(value) => MetricValue::Present(value),
            Err(e) => {
                tracing::warn!(address, error = %e, "Address balance fetch failed");
                MetricValue::Unavailable
            }
        }
    }
}

/// Every source the bot reads from, shared by the refresher and the commands
#[derive(Clone)]
pub struct MetricSources {
    pub price: Arc<dyn MetricSource>,
    pub hashrate: Arc<dyn MetricSource>,
    pub marketcap: Arc<dyn MetricSource>,
    pub htn_wallet: Arc<dyn MetricSource>,
    pub usdt_wallet: Arc<dyn MetricSource>,
    pub balances: Arc<dyn AddressBalance>,
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted response of a mock source
    #[derive(Debug, Clone, Copy)]
    pub enum Script {
        Value(f64),
        Fail,
        Panic,
    }

    /// Mock source for testing
    ///
    /// Answers from a queue of scripted responses; the last entry repeats.
    pub struct MockSource {
        kind: MetricKind,
        script: Mutex<Vec<Script>>,
        delay: Duration,
        call_count: Arc<AtomicUsize>,
    }

    impl MockSource {
        pub fn new(kind: MetricKind, script: Vec<Script>) -> Self {
            Self {
                kind,
                script: Mutex::new(script),
                delay: Duration::ZERO,
                call_count: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn value(kind: MetricKind, value: f64) -> Self {
            Self::new(kind, vec![Script::Value(value)])
        }

        pub fn failing(kind: MetricKind) -> Self {
            Self::new(kind, vec![Script::Fail])
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn next(&self) -> Script {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script.first().copied().unwrap_or(Script::Fail)
            }
        }
    }

    #[async_trait]
    impl MetricSource for MockSource {
        fn kind(&self) -> MetricKind {
            self.kind
        }

        async fn try_fetch(&self) -> Result<f64, FetchError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.next() {
                Script::Value(v) => Ok(v),
                Script::Fail => Err(FetchError::invalid("simulated transport error")),
                Script::Panic => panic!("simulated bug in {}", self.kind),
            }
        }
    }

    /// Mock address lookup returning a fixed outcome
    pub struct MockBalance(pub Option<f64>);

    #[async_trait]
    impl AddressBalance for MockBalance {
        async fn try_balance_of(&self, _address: &str) -> Result<f64, FetchError> {
            self.0.ok_or_else(|| FetchError::invalid("simulated transport error"))
        }
    }
}
