//! Spillway Channel - the sink delivery seam
//!
//! The drain side talks to the external streaming sink through one narrow
//! capability contract: open a channel for a (table, partition) key, append
//! rows with offset tokens, ask for the latest committed token, close. The
//! concrete sink (its SDK, its transport) lives entirely behind these
//! traits; the core never imports it.
//!
//! Two failure shapes are deliberately distinct:
//! - a **channel fault** (`Err(ChannelError)`) means the handle is unusable
//!   and must be invalidated and reopened;
//! - **row validation errors** inside an `Ok(AppendOutcome)` mean the sink
//!   refused that row's content but the channel is fine.

mod error;
mod registry;
pub mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use spillway_protocol::{Row, RowQueueKey};

pub use error::ChannelError;
pub use registry::ChannelRegistry;

/// Per-row result of an append: empty means the sink took the row.
#[derive(Debug, Clone, Default)]
pub struct AppendOutcome {
    /// Validation messages for this row; non-fatal to the channel
    pub errors: Vec<String>,
}

impl AppendOutcome {
    /// The sink accepted the row without complaint
    pub fn clean() -> Self {
        Self::default()
    }

    /// The sink refused the row's content
    pub fn with_errors(errors: Vec<String>) -> Self {
        Self { errors }
    }

    /// Whether the row went through without validation errors
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One open delivery handle to the sink.
#[async_trait]
pub trait SinkChannel: Send + Sync {
    /// Human-readable identity for logs
    fn name(&self) -> &str;

    /// Whether the handle believes it is still usable
    fn is_valid(&self) -> bool;

    /// Append one row under an offset token.
    ///
    /// `Err` is a channel fault; `Ok` with errors is a row rejected by the
    /// sink over a healthy channel.
    async fn append_row(&self, row: &Row, offset_token: &str)
        -> Result<AppendOutcome, ChannelError>;

    /// Latest offset token the sink has durably committed, if any.
    async fn latest_committed_token(&self) -> Result<Option<String>, ChannelError>;

    /// Release the handle.
    async fn close(&self) -> Result<(), ChannelError>;
}

/// Opens channels; implemented by the sink integration.
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    /// Open a channel for one partition queue.
    async fn open(&self, key: &RowQueueKey) -> Result<Arc<dyn SinkChannel>, ChannelError>;
}
