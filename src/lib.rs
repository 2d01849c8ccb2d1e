//! # HTN Status Bot
//!
//! Publishes Hoosat network metrics (price, hashrate, market cap and the
//! listing funding wallet balances) as Discord channel names and presence
//! text, and answers slash commands for the same values.
//!
//! ## Usage
//!
//! ```no_run
//! use htn_status_bot::{format, source::build_http_client, context::metric_sources};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = build_http_client()?;
//! let sources = metric_sources(&http, std::env::var("API_URL").ok());
//!
//! if let Some(price) = sources.price.fetch().await.value() {
//!     println!("HTN: ${}", format::price(price));
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod commands;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod format;
pub mod logging;
pub mod platform;
pub mod refresher;
pub mod source;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use context::AppContext;
pub use error::{ConfigError, FetchError, GatewayError, PlatformError};
pub use refresher::{Refresher, RefresherHandle};
pub use source::{MetricSource, MetricSources};
pub use types::{ChannelId, MetricKind, MetricValue};
