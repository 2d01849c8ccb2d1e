//! Application context: everything shared between the gateway handlers and
//! the background refresher, created once at startup

use crate::{
    commands::Responder,
    config::{ChannelConfig, Config},
    error::FetchError,
    platform::{ChatPlatform, DiscordPlatform, DiscordRest, PresenceHandle},
    refresher::{MetricSpec, Refresher, RefresherHandle},
    source::{build_http_client, MetricSources},
    sources::{HoosatApi, HoosatMetric, HoosatWallet, TronTokenBalance},
    types::{FundingWallet, MetricKind},
};
use reqwest::Client;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct AppContext {
    pub config: Config,
    pub rest: DiscordRest,
    pub responder: Arc<Responder>,
    refresher: Arc<Refresher>,
    started: AtomicBool,
    handle: Mutex<Option<RefresherHandle>>,
}

impl AppContext {
    /// Builds the shared client and every source from `config`
    pub fn build(
        config: Config,
        presence: PresenceHandle,
        latency_ms: Arc<AtomicU64>,
    ) -> Result<Self, FetchError> {
        let http = build_http_client()?;
        let sources = metric_sources(&http, config.api_url.clone());
        let rest = DiscordRest::new(http, config.token.clone());
        Ok(Self::new(config, sources, rest, presence, latency_ms))
    }

    pub fn new(
        config: Config,
        sources: MetricSources,
        rest: DiscordRest,
        presence: PresenceHandle,
        latency_ms: Arc<AtomicU64>,
    ) -> Self {
        let platform: Arc<dyn ChatPlatform> =
            Arc::new(DiscordPlatform::new(rest.clone(), presence));
        let api_configured = config.api_url.is_some();
        let refresher = Refresher::new(
            metric_specs(&sources, &config.channels, api_configured),
            platform,
            config.refresh_interval,
        );
        let responder = Responder::new(sources, api_configured, latency_ms);

        Self {
            config,
            rest,
            responder: Arc::new(responder),
            refresher: Arc::new(refresher),
            started: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// Starts the background refresher; later calls do nothing
    pub async fn start_refresher(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.handle.lock().await = self.refresher.clone().spawn();
    }

    pub async fn refresher_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the refresher, then drops the context along with its sources
    ///
    /// Interaction tasks still in flight keep their own client handles until
    /// they finish.
    pub async fn shutdown(self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.shutdown().await;
        }
    }
}

/// Sources for every metric, sharing one HTTP client
pub fn metric_sources(http: &Client, api_url: Option<String>) -> MetricSources {
    let api = Arc::new(HoosatApi::new(http.clone(), api_url));
    let wallet = FundingWallet::LISTING;

    MetricSources {
        price: Arc::new(HoosatMetric::price(api.clone())),
        hashrate: Arc::new(HoosatMetric::hashrate(api.clone())),
        marketcap: Arc::new(HoosatMetric::marketcap(api.clone())),
        htn_wallet: Arc::new(HoosatWallet::new(api.clone(), wallet.htn)),
        usdt_wallet: Arc::new(TronTokenBalance::usdt(http.clone(), wallet.tron_usdt)),
        balances: api,
    }
}

/// Metrics read from the Hoosat API rather than TronGrid
fn uses_hoosat_api(kind: MetricKind) -> bool {
    !matches!(kind, MetricKind::UsdtWallet)
}

/// Metrics the refresher fetches each cycle
///
/// A metric is fetched when it has a channel or feeds the presence text.
/// Without an API URL the Hoosat metrics are left out entirely.
pub fn metric_specs(
    sources: &MetricSources,
    channels: &ChannelConfig,
    api_configured: bool,
) -> Vec<MetricSpec> {
    [
        MetricSpec::new(sources.price.clone(), channels.price),
        MetricSpec::new(sources.hashrate.clone(), channels.hashrate),
        MetricSpec::new(sources.marketcap.clone(), channels.marketcap),
        MetricSpec::new(sources.htn_wallet.clone(), channels.htn_wallet),
        MetricSpec::new(sources.usdt_wallet.clone(), channels.usdt_wallet),
    ]
    .into_iter()
    .filter(|spec| api_configured || !uses_hoosat_api(spec.kind))
    .filter(|spec| spec.channel.is_configured() || spec.in_presence)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::{MockBalance, MockSource};
    use crate::types::ChannelId;
    use std::time::Duration;

    fn mock_sources() -> MetricSources {
        MetricSources {
            price: Arc::new(MockSource::value(MetricKind::Price, 0.01)),
            hashrate: Arc::new(MockSource::value(MetricKind::Hashrate, 1.5)),
            marketcap: Arc::new(MockSource::value(MetricKind::MarketCap, 2_000_000.0)),
            htn_wallet: Arc::new(MockSource::value(MetricKind::HtnWallet, 0.0)),
            usdt_wallet: Arc::new(MockSource::value(MetricKind::UsdtWallet, 0.0)),
            balances: Arc::new(MockBalance(None)),
        }
    }

    fn config(channels: ChannelConfig) -> Config {
        let mut config = Config::from_lookup(|name| match name {
            "TOKEN" => Some("t".to_string()),
            "API_URL" => Some("http://hoosat.invalid".to_string()),
            _ => None,
        })
        .unwrap();
        config.channels = channels;
        config
    }

    fn context(server: &mockito::Server, channels: ChannelConfig) -> AppContext {
        let http = build_http_client().unwrap();
        let rest = DiscordRest::with_base_url(http, server.url(), "t");
        let (presence, _rx) = PresenceHandle::new();
        AppContext::new(
            config(channels),
            mock_sources(),
            rest,
            presence,
            Arc::new(AtomicU64::new(0)),
        )
    }

    #[test]
    fn test_specs_skip_unpublished_wallets() {
        let kinds = |channels: &ChannelConfig| -> Vec<MetricKind> {
            metric_specs(&mock_sources(), channels, true)
                .iter()
                .map(|spec| spec.kind)
                .collect()
        };

        assert_eq!(
            kinds(&ChannelConfig::default()),
            vec![MetricKind::Price, MetricKind::Hashrate]
        );
        assert_eq!(
            kinds(&ChannelConfig {
                usdt_wallet: Some(ChannelId(5)),
                ..Default::default()
            }),
            vec![MetricKind::Price, MetricKind::Hashrate, MetricKind::UsdtWallet]
        );
    }

    #[test]
    fn test_no_hoosat_specs_without_api_url() {
        let channels = ChannelConfig {
            price: Some(ChannelId(1)),
            hashrate: Some(ChannelId(2)),
            marketcap: Some(ChannelId(3)),
            htn_wallet: Some(ChannelId(4)),
            usdt_wallet: Some(ChannelId(5)),
        };

        let kinds: Vec<MetricKind> = metric_specs(&mock_sources(), &channels, false)
            .iter()
            .map(|spec| spec.kind)
            .collect();
        assert_eq!(kinds, vec![MetricKind::UsdtWallet]);

        assert!(metric_specs(&mock_sources(), &ChannelConfig::default(), false).is_empty());
    }

    #[tokio::test]
    async fn test_refresher_disabled_when_only_hoosat_channels_lack_api() {
        let server = mockito::Server::new_async().await;
        let mut config = config(ChannelConfig {
            price: Some(ChannelId(1)),
            ..Default::default()
        });
        config.api_url = None;
        let rest = DiscordRest::with_base_url(build_http_client().unwrap(), server.url(), "t");
        let (presence, _rx) = PresenceHandle::new();
        let context = AppContext::new(
            config,
            mock_sources(),
            rest,
            presence,
            Arc::new(AtomicU64::new(0)),
        );

        context.start_refresher().await;
        assert!(!context.refresher_running().await);
        context.shutdown().await;
    }

    #[test]
    fn test_sources_without_api_url() {
        let http = build_http_client().unwrap();
        let sources = metric_sources(&http, None);
        assert_eq!(sources.price.kind(), MetricKind::Price);
        assert_eq!(sources.usdt_wallet.kind(), MetricKind::UsdtWallet);
    }

    #[tokio::test]
    async fn test_refresher_disabled_without_channels() {
        let server = mockito::Server::new_async().await;
        let context = context(&server, ChannelConfig::default());

        context.start_refresher().await;
        assert!(!context.refresher_running().await);
        context.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresher_started_once() {
        let mut server = mockito::Server::new_async().await;
        let rename = server
            .mock("PATCH", "/channels/1")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let context = context(
            &server,
            ChannelConfig {
                price: Some(ChannelId(1)),
                ..Default::default()
            },
        );

        context.start_refresher().await;
        context.start_refresher().await;
        assert!(context.refresher_running().await);

        for _ in 0..50 {
            if rename.matched_async().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        context.shutdown().await;
        rename.assert_async().await;
    }
}
