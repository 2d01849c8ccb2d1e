//! Discord implementation of [`ChatPlatform`]

use super::{rest::DiscordRest, ChatPlatform};
use crate::{error::PlatformError, types::ChannelId};
use async_trait::async_trait;
use tokio::sync::watch;

/// Latest presence text, picked up by whichever gateway session is live
#[derive(Clone)]
pub struct PresenceHandle {
    tx: watch::Sender<Option<String>>,
}

impl PresenceHandle {
    /// Creates the handle and the receiver a [`Gateway`](super::Gateway) reads from
    pub fn new() -> (Self, watch::Receiver<Option<String>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    /// Publishes new presence text
    ///
    /// Identical text is not re-sent to the gateway.
    pub fn set(&self, text: &str) -> Result<(), PlatformError> {
        if self.tx.is_closed() {
            return Err(PlatformError::Closed);
        }
        self.tx.send_if_modified(|current| {
            if current.as_deref() == Some(text) {
                false
            } else {
                *current = Some(text.to_string());
                true
            }
        });
        Ok(())
    }

    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }
}

/// Channel renames over REST, presence over the gateway
pub struct DiscordPlatform {
    rest: DiscordRest,
    presence: PresenceHandle,
}

impl DiscordPlatform {
    pub fn new(rest: DiscordRest, presence: PresenceHandle) -> Self {
        Self { rest, presence }
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn rename_channel(&self, channel: ChannelId, name: &str) -> Result<(), PlatformError> {
        self.rest.rename_channel(channel, name).await
    }

    async fn set_presence(&self, text: &str) -> Result<(), PlatformError> {
        self.presence.set(text)
    }

    fn platform_name(&self) -> &'static str {
        "discord"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_presence_only_signals_changes() {
        let (handle, mut rx) = PresenceHandle::new();

        handle.set("$1").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_deref(), Some("$1"));

        handle.set("$1").unwrap();
        assert!(!rx.has_changed().unwrap());

        handle.set("$2").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(handle.current().as_deref(), Some("$2"));
    }

    #[test]
    fn test_presence_without_gateway() {
        let (handle, rx) = PresenceHandle::new();
        drop(rx);
        assert!(matches!(handle.set("$1"), Err(PlatformError::Closed)));
    }
}
