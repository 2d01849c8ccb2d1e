//! Refresh cycle coordinator
//!
//! Every interval, all configured metrics are fetched concurrently. The
//! readings that came back are written to their channels and the presence
//! text; unavailable ones leave their outputs untouched until a later cycle.
//!
//! ```text
//! Refresher::spawn
//!     ↓
//! Background Task (ticks every interval, measured from cycle start)
//!     ↓
//! MetricSource::fetch × N (joined, never short-circuited)
//!     ↓
//! ChannelUpdater::rename / ChatPlatform::set_presence
//! ```

use crate::{
    channel::{ChannelUpdater, OutputChannel},
    format,
    platform::ChatPlatform,
    source::MetricSource,
    types::{ChannelId, MetricKind, MetricReading, RefreshCycleResult},
};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Static configuration of one published metric
pub struct MetricSpec {
    pub kind: MetricKind,
    pub source: Arc<dyn MetricSource>,
    pub channel: OutputChannel,
    /// Whether the metric contributes to the presence text
    pub in_presence: bool,
}

impl MetricSpec {
    /// Spec for `source`, published to `channel` when one is configured
    ///
    /// Price and hashrate also feed the presence text.
    pub fn new(source: Arc<dyn MetricSource>, channel: Option<ChannelId>) -> Self {
        let kind = source.kind();
        Self {
            kind,
            source,
            channel: OutputChannel::new(kind.label(), channel),
            in_presence: matches!(kind, MetricKind::Price | MetricKind::Hashrate),
        }
    }
}

/// Periodically republishes metrics as channel names and presence
pub struct Refresher {
    specs: Vec<MetricSpec>,
    updater: ChannelUpdater,
    platform: Arc<dyn ChatPlatform>,
    interval: Duration,
}

impl Refresher {
    pub fn new(
        specs: Vec<MetricSpec>,
        platform: Arc<dyn ChatPlatform>,
        interval: Duration,
    ) -> Self {
        Self {
            specs,
            updater: ChannelUpdater::new(platform.clone()),
            platform,
            interval,
        }
    }

    /// True when at least one output channel is configured
    pub fn has_outputs(&self) -> bool {
        self.specs.iter().any(|spec| spec.channel.is_configured())
    }

    /// Fetches every metric concurrently and waits for all of them
    pub async fn fetch_all(&self) -> RefreshCycleResult {
        let mut result = RefreshCycleResult::begin();

        let values = join_all(self.specs.iter().map(|spec| spec.source.fetch())).await;

        result.readings = self
            .specs
            .iter()
            .zip(values)
            .map(|(spec, value)| MetricReading {
                kind: spec.kind,
                value,
            })
            .collect();

        result
    }

    /// Writes the available readings to their outputs
    ///
    /// Presence is replaced at most once, and only if some part of it is
    /// available.
    pub async fn apply(&self, result: &RefreshCycleResult) {
        for (spec, reading) in self.specs.iter().zip(&result.readings) {
            if let Some(value) = reading.value.value() {
                self.updater
                    .rename(&spec.channel, &format::channel_name(spec.kind, value))
                    .await;
            }
        }

        let presence = format::presence(
            self.specs
                .iter()
                .zip(&result.readings)
                .filter(|(spec, _)| spec.in_presence)
                .map(|(_, reading)| (reading.kind, reading.value)),
        );

        if let Some(text) = presence {
            if let Err(e) = self.platform.set_presence(&text).await {
                tracing::warn!(error = %e, presence = %text, "Failed to update presence");
            }
        }
    }

    /// Runs one full cycle
    pub async fn run_cycle(&self) -> RefreshCycleResult {
        let start = Instant::now();
        let result = self.fetch_all().await;
        self.apply(&result).await;

        tracing::debug!(
            cycle_id = %result.cycle_id,
            started_at = %result.started_at,
            available = result.available_count(),
            total = result.readings.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Refresh cycle complete"
        );

        result
    }

    /// Starts the background loop
    ///
    /// Returns `None` without starting anything when no output channel is
    /// configured.
    pub fn spawn(self: Arc<Self>) -> Option<RefresherHandle> {
        if !self.has_outputs() {
            tracing::info!("No channel IDs configured; background channel updater is disabled");
            return None;
        }

        let task = tokio::spawn(async move {
            tracing::info!(
                refresh_interval_secs = self.interval.as_secs(),
                metrics = self.specs.len(),
                "Starting channel refresher background task"
            );

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if let Err(panic) = AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                    tracing::error!(
                        error = panic_message(panic.as_ref()),
                        "Background update cycle failed"
                    );
                }
            }
        });

        Some(RefresherHandle { task })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Handle to the running background loop
pub struct RefresherHandle {
    task: JoinHandle<()>,
}

impl RefresherHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the loop, including any cycle in flight, and waits for it
    pub async fn shutdown(self) {
        self.task.abort();
        match self.task.await {
            Err(e) if e.is_cancelled() => tracing::debug!("Channel refresher stopped"),
            Err(e) => tracing::warn!(error = %e, "Channel refresher ended abnormally"),
            Ok(()) => {}
        }
    }
}
