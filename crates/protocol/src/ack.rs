//! Enqueue acknowledgement
//!
//! The only thing a producer ever observes: how many rows of its batch were
//! accepted and how many were rejected. Delivery to the sink happens later
//! and is not reflected here. A non-zero rejected count is the caller's
//! backpressure signal.

use serde::{Deserialize, Serialize};

/// Message returned when the request body cannot be parsed at all.
pub const PARSE_FAILURE_MESSAGE: &str = "Unable to parse request body";

/// Synchronous response to an enqueue call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueAck {
    /// Present only when the request itself failed (e.g. unparseable body)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Rows accepted into the queue by this call
    pub rows_enqueued: u64,

    /// Rows rejected by this call (queue at capacity)
    pub rows_rejected: u64,
}

impl EnqueueAck {
    /// Ack for a batch that reached the queue
    pub fn counts(rows_enqueued: u64, rows_rejected: u64) -> Self {
        Self {
            message: None,
            rows_enqueued,
            rows_rejected,
        }
    }

    /// Ack for a body that could not be parsed; nothing was enqueued
    pub fn parse_failure() -> Self {
        Self {
            message: Some(PARSE_FAILURE_MESSAGE.to_string()),
            rows_enqueued: 0,
            rows_rejected: 0,
        }
    }

    /// Whether the caller should treat this response as a backpressure signal
    #[inline]
    pub fn is_backpressured(&self) -> bool {
        self.rows_rejected > 0
    }
}
