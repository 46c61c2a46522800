//! Test doubles for sink channels
//!
//! An in-memory channel that records every append, plus an opener that
//! hands out one channel per key. Downstream crates use these to exercise
//! drain and recovery paths without a live sink. The channel is scriptable:
//! tests can make the next append fault, flag rows with validation errors,
//! pin the committed token, or slow appends down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use spillway_protocol::{Row, RowQueueKey};

use crate::{AppendOutcome, ChannelError, ChannelOpener, SinkChannel};

/// In-memory sink channel that records appended rows.
///
/// By default it behaves like a sink that commits instantly: the latest
/// committed token is the token of the last appended row.
pub struct RecordingChannel {
    name: String,
    valid: AtomicBool,
    fail_next_append: AtomicBool,
    fail_commit_polls: AtomicBool,
    validation_error: Mutex<Option<String>>,
    committed_override: Mutex<Option<String>>,
    append_delay: Mutex<Option<Duration>>,
    appended: Mutex<Vec<(Row, String)>>,
    closed: AtomicBool,
}

impl RecordingChannel {
    /// Create a healthy channel with nothing appended.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            valid: AtomicBool::new(true),
            fail_next_append: AtomicBool::new(false),
            fail_commit_polls: AtomicBool::new(false),
            validation_error: Mutex::new(None),
            committed_override: Mutex::new(None),
            append_delay: Mutex::new(None),
            appended: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Make the next append fail with a channel fault.
    ///
    /// The fault also marks the channel invalid, like a handle that died
    /// mid-stream. The faulted row is not recorded.
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    /// Toggle whether commit polls fail with a channel fault.
    pub fn set_fail_commit_polls(&self, fail: bool) {
        self.fail_commit_polls.store(fail, Ordering::SeqCst);
    }

    /// Flag every appended row with the given validation error.
    ///
    /// The rows are still recorded; a real sink commits past rows it
    /// rejected for content.
    pub fn reject_rows_with(&self, error: impl Into<String>) {
        *self.validation_error.lock() = Some(error.into());
    }

    /// Pin the committed token instead of tracking the last append.
    pub fn set_committed_token(&self, token: impl Into<String>) {
        *self.committed_override.lock() = Some(token.into());
    }

    /// Sleep this long inside every append, to keep a drain in flight.
    pub fn set_append_delay(&self, delay: Duration) {
        *self.append_delay.lock() = Some(delay);
    }

    /// Mark the handle invalid without faulting an append.
    pub fn mark_invalid(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    /// Mark the handle valid again, as a freshly opened one would be.
    pub fn revalidate(&self) {
        self.valid.store(true, Ordering::SeqCst);
    }

    /// Every appended row with its offset token, in append order.
    pub fn appended(&self) -> Vec<(Row, String)> {
        self.appended.lock().clone()
    }

    /// Just the offset tokens, in append order.
    pub fn appended_tokens(&self) -> Vec<String> {
        self.appended
            .lock()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    /// How many rows have been appended.
    pub fn append_count(&self) -> usize {
        self.appended.lock().len()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SinkChannel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    async fn append_row(
        &self,
        row: &Row,
        offset_token: &str,
    ) -> Result<AppendOutcome, ChannelError> {
        let delay = *self.append_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            self.valid.store(false, Ordering::SeqCst);
            return Err(ChannelError::fault(self.name.clone(), "append stream broke"));
        }

        self.appended
            .lock()
            .push((row.clone(), offset_token.to_string()));

        let validation = self.validation_error.lock().clone();
        match validation {
            Some(error) => Ok(AppendOutcome::with_errors(vec![error])),
            None => Ok(AppendOutcome::clean()),
        }
    }

    async fn latest_committed_token(&self) -> Result<Option<String>, ChannelError> {
        if self.fail_commit_polls.load(Ordering::SeqCst) {
            return Err(ChannelError::fault(self.name.clone(), "commit poll failed"));
        }
        if let Some(token) = self.committed_override.lock().clone() {
            return Ok(Some(token));
        }
        Ok(self
            .appended
            .lock()
            .last()
            .map(|(_, token)| token.clone()))
    }

    async fn close(&self) -> Result<(), ChannelError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for RecordingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingChannel")
            .field("name", &self.name)
            .field("appended", &self.append_count())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Opener that hands out one [`RecordingChannel`] per key.
///
/// The channel instance survives invalidation: reopening a key returns
/// the same (revalidated) channel, so tests can assert on rows appended
/// across reopens.
#[derive(Default)]
pub struct RecordingOpener {
    channels: Mutex<HashMap<RowQueueKey, Arc<RecordingChannel>>>,
    opens: AtomicU64,
    fail_opens: AtomicBool,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel for a key, created on first use.
    ///
    /// Lets a test script a channel before anything opens it.
    pub fn channel(&self, key: &RowQueueKey) -> Arc<RecordingChannel> {
        Arc::clone(
            self.channels
                .lock()
                .entry(key.clone())
                .or_insert_with(|| Arc::new(RecordingChannel::new(key.to_string()))),
        )
    }

    /// How many times `open` has been called.
    pub fn open_count(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Toggle whether subsequent opens fail.
    pub fn set_fail_opens(&self, fail: bool) {
        self.fail_opens.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChannelOpener for RecordingOpener {
    async fn open(&self, key: &RowQueueKey) -> Result<Arc<dyn SinkChannel>, ChannelError> {
        if self.fail_opens.load(Ordering::SeqCst) {
            return Err(ChannelError::open_failed(key, "opener scripted to fail"));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        let channel = self.channel(key);
        channel.revalidate();
        Ok(channel)
    }
}

impl std::fmt::Debug for RecordingOpener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingOpener")
            .field("opens", &self.open_count())
            .finish()
    }
}
