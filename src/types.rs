//! Types shared by the sources, the refresher and the command responder

use crate::constants::{FUNDING_HTN_WALLET, FUNDING_TRON_USDT_WALLET};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Outcome of a single metric fetch
///
/// `Unavailable` is produced only by explicit error handling in a source.
/// A present zero is a real value (an empty wallet), not a failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// The source answered with this value
    Present(f64),
    /// The source could not be read this cycle
    Unavailable,
}

impl MetricValue {
    /// Returns the value if present
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Present(v) => Some(*v),
            MetricValue::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, MetricValue::Present(_))
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(MetricValue::Unavailable, MetricValue::Present)
    }
}

/// The metrics published by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// HTN price in USDT
    Price,
    /// Network hashrate, reported in TH/s
    Hashrate,
    /// Market capitalization in USDT
    MarketCap,
    /// HTN balance of the listing funding wallet
    HtnWallet,
    /// TRC20 USDT balance of the listing funding wallet
    UsdtWallet,
}

impl MetricKind {
    /// Label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Price => "price",
            MetricKind::Hashrate => "hashrate",
            MetricKind::MarketCap => "marketcap",
            MetricKind::HtnWallet => "htn wallet",
            MetricKind::UsdtWallet => "usdt wallet",
        }
    }

    /// Get all metrics, in publishing order
    pub fn all() -> &'static [MetricKind] {
        &[
            MetricKind::Price,
            MetricKind::Hashrate,
            MetricKind::MarketCap,
            MetricKind::HtnWallet,
            MetricKind::UsdtWallet,
        ]
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Discord snowflake identifying a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two listing funding wallets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingWallet {
    /// Native Hoosat address
    pub htn: &'static str,
    /// TRON address holding TRC20 USDT
    pub tron_usdt: &'static str,
}

impl FundingWallet {
    pub const LISTING: FundingWallet = FundingWallet {
        htn: FUNDING_HTN_WALLET,
        tron_usdt: FUNDING_TRON_USDT_WALLET,
    };
}

/// A metric value read during one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricReading {
    pub kind: MetricKind,
    pub value: MetricValue,
}

/// Everything fetched during one refresh cycle
///
/// Built fresh every cycle and dropped once applied.
#[derive(Debug, Clone)]
pub struct RefreshCycleResult {
    /// Identifier used to correlate the cycle's log lines
    pub cycle_id: Uuid,
    /// When the fetches were issued
    pub started_at: DateTime<Utc>,
    /// One reading per configured metric, in configuration order
    pub readings: Vec<MetricReading>,
}

impl RefreshCycleResult {
    /// Create an empty result for a cycle starting now
    pub fn begin() -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            readings: Vec::new(),
        }
    }

    /// Value read for a metric; `Unavailable` if it was not part of the cycle
    pub fn get(&self, kind: MetricKind) -> MetricValue {
        self.readings
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.value)
            .unwrap_or(MetricValue::Unavailable)
    }

    /// Number of readings that came back with a value
    pub fn available_count(&self) -> usize {
        self.readings.iter().filter(|r| r.value.is_available()).count()
    }
}
