//! Display formatting for metric values
//!
//! Everything here is pure. Numbers are rendered with an ASCII `.` first and
//! [`decimal_marker`] is applied once, as the very last step, by the
//! display helpers. Never feed a marked string back into arithmetic.

use crate::constants::{DECIMAL_MARKER, PRESENCE_MAX_CHARS};
use crate::types::{MetricKind, MetricValue};

/// Renders `value` with a fixed number of decimal places
pub fn fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Renders `value` with a `K`/`M` magnitude suffix
///
/// Values below 1,000 get no suffix.
pub fn compact(value: f64, decimals: usize) -> String {
    let magnitude = value.abs();
    if magnitude >= 1_000_000.0 {
        format!("{}M", fixed(value / 1_000_000.0, decimals))
    } else if magnitude >= 1_000.0 {
        format!("{}K", fixed(value / 1_000.0, decimals))
    } else {
        fixed(value, decimals)
    }
}

/// Swaps every ASCII period for the display decimal marker
pub fn decimal_marker(s: &str) -> String {
    s.replace('.', &DECIMAL_MARKER.to_string())
}

/// Converts a terahash/s reading to gigahash/s
pub fn th_to_gh(th_per_sec: f64) -> f64 {
    th_per_sec * 1000.0
}

/// Price at 6 decimal places
pub fn price(value: f64) -> String {
    decimal_marker(&fixed(value, 6))
}

/// Hashrate in GH/s at 2 decimal places, from a TH/s reading
pub fn hashrate_gh(th_per_sec: f64) -> String {
    decimal_marker(&fixed(th_to_gh(th_per_sec), 2))
}

/// Market cap or wallet balance, compact at 2 decimal places
pub fn amount(value: f64) -> String {
    decimal_marker(&compact(value, 2))
}

/// Exact HTN amount at 8 decimal places
pub fn htn_exact(value: f64) -> String {
    decimal_marker(&fixed(value, 8))
}

/// USDT value at 2 decimal places
pub fn usdt(value: f64) -> String {
    decimal_marker(&fixed(value, 2))
}

/// Channel name published for a metric
pub fn channel_name(kind: MetricKind, value: f64) -> String {
    match kind {
        MetricKind::Price => format!("💰 ${} HTN", price(value)),
        MetricKind::Hashrate => format!("⛏️ {} GH/s", hashrate_gh(value)),
        MetricKind::MarketCap => format!("💹 {} USDT", amount(value)),
        MetricKind::HtnWallet => format!("💸 {} HTN", amount(value)),
        MetricKind::UsdtWallet => format!("💸 {} TRC20 USDT", amount(value)),
    }
}

/// Presence fragment for a metric, if that metric appears in the presence
pub fn presence_fragment(kind: MetricKind, value: f64) -> Option<String> {
    match kind {
        MetricKind::Price => Some(format!("${}", price(value))),
        MetricKind::Hashrate => Some(format!("{} GH/s", hashrate_gh(value))),
        _ => None,
    }
}

/// Joins the available presence fragments
///
/// Returns `None` when nothing is available, in which case the current
/// presence should be left alone.
pub fn presence<I>(readings: I) -> Option<String>
where
    I: IntoIterator<Item = (MetricKind, MetricValue)>,
{
    let parts: Vec<String> = readings
        .into_iter()
        .filter_map(|(kind, value)| value.value().and_then(|v| presence_fragment(kind, v)))
        .collect();

    if parts.is_empty() {
        return None;
    }

    Some(parts.join(" | ").chars().take(PRESENCE_MAX_CHARS).collect())
}
