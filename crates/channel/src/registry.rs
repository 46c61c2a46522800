//! Cached channel handles keyed by row queue
//!
//! Opening a channel is expensive, so the registry opens each one once and
//! hands out clones of the `Arc` until the handle is invalidated. Opens are
//! serialized under the registry lock: two workers asking for the same key
//! at the same time produce a single open call.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use spillway_protocol::RowQueueKey;

use crate::{ChannelError, ChannelOpener, SinkChannel};

/// Registry of open sink channels, one per row queue key.
pub struct ChannelRegistry {
    opener: Arc<dyn ChannelOpener>,
    channels: Mutex<HashMap<RowQueueKey, Arc<dyn SinkChannel>>>,
}

impl ChannelRegistry {
    /// Create a registry that opens channels through the given opener.
    pub fn new(opener: Arc<dyn ChannelOpener>) -> Self {
        Self {
            opener,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached channel for a key, opening one if none is cached.
    pub async fn channel_for(
        &self,
        key: &RowQueueKey,
    ) -> Result<Arc<dyn SinkChannel>, ChannelError> {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get(key) {
            return Ok(Arc::clone(channel));
        }

        let channel = self.opener.open(key).await?;
        tracing::debug!(key = %key, channel = channel.name(), "opened sink channel");
        channels.insert(key.clone(), Arc::clone(&channel));
        Ok(channel)
    }

    /// Drop the cached handle for a key and close it.
    ///
    /// The next `channel_for` call for the key opens a fresh channel.
    pub async fn invalidate(&self, key: &RowQueueKey) {
        let removed = self.channels.lock().await.remove(key);
        let Some(channel) = removed else {
            return;
        };

        tracing::warn!(key = %key, channel = channel.name(), "invalidated sink channel");
        if let Err(e) = channel.close().await {
            tracing::debug!(key = %key, error = %e, "error closing invalidated channel");
        }
    }

    /// Close every cached channel and empty the registry.
    pub async fn close_all(&self) {
        let channels = std::mem::take(&mut *self.channels.lock().await);
        for (key, channel) in channels {
            if let Err(e) = channel.close().await {
                tracing::warn!(key = %key, error = %e, "error closing channel during shutdown");
            }
        }
    }

    /// Number of currently cached channels.
    pub async fn cached_count(&self) -> usize {
        self.channels.lock().await.len()
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use spillway_protocol::{PartitionIndex, TableRef};

    use super::*;
    use crate::testing::RecordingOpener;

    fn key(table: &str, partition: i64) -> RowQueueKey {
        RowQueueKey::new(
            TableRef::new("db", "public", table),
            PartitionIndex::new(partition),
        )
    }

    #[tokio::test]
    async fn test_channel_is_opened_once_and_cached() {
        let opener = Arc::new(RecordingOpener::new());
        let registry = ChannelRegistry::new(Arc::clone(&opener) as Arc<dyn ChannelOpener>);

        let k = key("events", 0);
        let first = registry.channel_for(&k).await.unwrap();
        let second = registry.channel_for(&k).await.unwrap();

        assert_eq!(opener.open_count(), 1);
        assert_eq!(first.name(), second.name());
        assert_eq!(registry.cached_count().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_get_distinct_channels() {
        let opener = Arc::new(RecordingOpener::new());
        let registry = ChannelRegistry::new(Arc::clone(&opener) as Arc<dyn ChannelOpener>);

        registry.channel_for(&key("events", 0)).await.unwrap();
        registry.channel_for(&key("events", 1)).await.unwrap();

        assert_eq!(opener.open_count(), 2);
        assert_eq!(registry.cached_count().await, 2);
    }

    #[tokio::test]
    async fn test_invalidate_closes_and_forces_reopen() {
        let opener = Arc::new(RecordingOpener::new());
        let registry = ChannelRegistry::new(Arc::clone(&opener) as Arc<dyn ChannelOpener>);

        let k = key("events", 0);
        let channel = opener.channel(&k);
        registry.channel_for(&k).await.unwrap();

        registry.invalidate(&k).await;
        assert!(channel.is_closed());
        assert_eq!(registry.cached_count().await, 0);

        registry.channel_for(&k).await.unwrap();
        assert_eq!(opener.open_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_unknown_key_is_a_no_op() {
        let opener = Arc::new(RecordingOpener::new());
        let registry = ChannelRegistry::new(opener as Arc<dyn ChannelOpener>);

        registry.invalidate(&key("events", 7)).await;
        assert_eq!(registry.cached_count().await, 0);
    }

    #[tokio::test]
    async fn test_close_all_empties_the_registry() {
        let opener = Arc::new(RecordingOpener::new());
        let registry = ChannelRegistry::new(Arc::clone(&opener) as Arc<dyn ChannelOpener>);

        let a = key("a", 0);
        let b = key("b", 0);
        registry.channel_for(&a).await.unwrap();
        registry.channel_for(&b).await.unwrap();

        registry.close_all().await;
        assert!(opener.channel(&a).is_closed());
        assert!(opener.channel(&b).is_closed());
        assert_eq!(registry.cached_count().await, 0);
    }

    #[tokio::test]
    async fn test_open_failure_propagates_and_caches_nothing() {
        let opener = Arc::new(RecordingOpener::new());
        opener.set_fail_opens(true);
        let registry = ChannelRegistry::new(Arc::clone(&opener) as Arc<dyn ChannelOpener>);

        let err = registry.channel_for(&key("events", 0)).await.unwrap_err();
        assert!(matches!(err, ChannelError::OpenFailed { .. }));
        assert_eq!(registry.cached_count().await, 0);

        // A later attempt succeeds once the opener recovers.
        opener.set_fail_opens(false);
        registry.channel_for(&key("events", 0)).await.unwrap();
        assert_eq!(registry.cached_count().await, 1);
    }
}
