//! Metric source implementations

pub mod hoosat;
pub mod tron;

pub use hoosat::{is_hoosat_address, HoosatApi, HoosatMetric, HoosatWallet};
pub use tron::TronTokenBalance;
