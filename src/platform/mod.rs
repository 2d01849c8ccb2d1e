//! Chat platform abstraction
//!
//! The refresher only needs two writes from the platform: renaming a channel
//! and replacing the bot's presence text. [`DiscordPlatform`] provides them
//! over the Discord REST API and gateway.

pub mod discord;
pub mod gateway;
pub mod rest;

pub use discord::{DiscordPlatform, PresenceHandle};
pub use gateway::{Gateway, GatewayEvent, Interaction};
pub use rest::DiscordRest;

use crate::{error::PlatformError, types::ChannelId};
use async_trait::async_trait;

/// Trait for the platform the bot publishes to
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Renames a channel
    async fn rename_channel(&self, channel: ChannelId, name: &str) -> Result<(), PlatformError>;

    /// Replaces the bot's presence text
    async fn set_presence(&self, text: &str) -> Result<(), PlatformError>;

    /// Returns the name of this platform
    fn platform_name(&self) -> &'static str;
}
