//! Output channel renaming with per-channel failure isolation

use crate::{platform::ChatPlatform, types::ChannelId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A channel the bot may rename, or nothing if it was not configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChannel {
    label: &'static str,
    id: Option<ChannelId>,
}

impl OutputChannel {
    pub fn new(label: &'static str, id: Option<ChannelId>) -> Self {
        Self { label, id }
    }

    /// An unconfigured channel; renaming it does nothing
    pub fn none(label: &'static str) -> Self {
        Self { label, id: None }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn id(&self) -> Option<ChannelId> {
        self.id
    }

    pub fn is_configured(&self) -> bool {
        self.id.is_some()
    }
}

/// Applies channel renames, never failing to the caller
///
/// Remembers the last name applied to each channel and skips renames that
/// would not change it; the platform rate-limits channel edits heavily.
pub struct ChannelUpdater {
    platform: Arc<dyn ChatPlatform>,
    applied: Mutex<HashMap<ChannelId, String>>,
}

impl ChannelUpdater {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self {
            platform,
            applied: Mutex::new(HashMap::new()),
        }
    }

    /// Renames `channel` to `new_name`
    ///
    /// Failures are logged and forgotten, so the next cycle tries again.
    pub async fn rename(&self, channel: &OutputChannel, new_name: &str) {
        let Some(id) = channel.id() else {
            return;
        };

        if self.applied.lock().await.get(&id).map(String::as_str) == Some(new_name) {
            tracing::debug!(channel = channel.label(), name = new_name, "Channel name unchanged");
            return;
        }

        match self.platform.rename_channel(id, new_name).await {
            Ok(()) => {
                self.applied.lock().await.insert(id, new_name.to_string());
                tracing::info!(channel = channel.label(), name = new_name, "Updated channel name");
            }
            Err(e) => {
                tracing::warn!(
                    channel = channel.label(),
                    channel_id = %id,
                    platform = self.platform.platform_name(),
                    error = %e,
                    "Failed to update channel"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockPlatform;

    #[tokio::test]
    async fn test_unconfigured_channel_is_noop() {
        let platform = Arc::new(MockPlatform::new());
        let updater = ChannelUpdater::new(platform.clone());

        updater.rename(&OutputChannel::none("price"), "💰 $1 HTN").await;
        assert!(platform.renames().is_empty());
    }

    #[tokio::test]
    async fn test_failure_isolated_per_channel() {
        let platform = Arc::new(MockPlatform::new());
        platform.fail_channel(ChannelId(1));
        let updater = ChannelUpdater::new(platform.clone());

        updater
            .rename(&OutputChannel::new("price", Some(ChannelId(1))), "a")
            .await;
        updater
            .rename(&OutputChannel::new("hashrate", Some(ChannelId(2))), "b")
            .await;

        assert!(platform.renames_of(ChannelId(1)).is_empty());
        assert_eq!(platform.renames_of(ChannelId(2)), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_unchanged_name_not_resent() {
        let platform = Arc::new(MockPlatform::new());
        let updater = ChannelUpdater::new(platform.clone());
        let channel = OutputChannel::new("price", Some(ChannelId(7)));

        updater.rename(&channel, "a").await;
        updater.rename(&channel, "a").await;
        updater.rename(&channel, "b").await;

        assert_eq!(
            platform.renames_of(ChannelId(7)),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
