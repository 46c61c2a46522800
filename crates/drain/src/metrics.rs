//! Drain scheduler metrics
//!
//! Atomic counters for scheduler passes and drain outcomes.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::worker::TerminationReason;

/// Counters covering the scheduler loop and every drain it runs
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently.
#[derive(Debug, Default)]
pub struct DrainMetrics {
    /// Scheduler passes started
    ticks: AtomicU64,

    /// Partitions claimed by a scan
    partitions_claimed: AtomicU64,

    /// Drain tasks handed to the pool
    tasks_dispatched: AtomicU64,

    /// Submissions refused because the pool was saturated
    submissions_rejected: AtomicU64,

    /// Drains that ran through their commit wait
    drains_succeeded: AtomicU64,

    /// Drains abandoned on a channel fault
    drains_channel_error: AtomicU64,

    /// Drains that died to an unexpected error
    drains_unexpected_error: AtomicU64,

    /// Rows handed to sink channels
    rows_drained: AtomicU64,
}

impl DrainMetrics {
    /// Create a new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            partitions_claimed: AtomicU64::new(0),
            tasks_dispatched: AtomicU64::new(0),
            submissions_rejected: AtomicU64::new(0),
            drains_succeeded: AtomicU64::new(0),
            drains_channel_error: AtomicU64::new(0),
            drains_unexpected_error: AtomicU64::new(0),
            rows_drained: AtomicU64::new(0),
        }
    }

    /// Record the start of a scheduler pass
    #[inline]
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a partition claimed by a scan
    #[inline]
    pub fn record_claimed(&self) {
        self.partitions_claimed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a drain task handed to the pool
    #[inline]
    pub fn record_dispatched(&self) {
        self.tasks_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submission refused by a saturated pool
    #[inline]
    pub fn record_rejected(&self) {
        self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one row handed to a sink channel
    #[inline]
    pub fn record_row_drained(&self) {
        self.rows_drained.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a drain ended
    #[inline]
    pub fn record_termination(&self, reason: TerminationReason) {
        let counter = match reason {
            TerminationReason::Success => &self.drains_succeeded,
            TerminationReason::ChannelError => &self.drains_channel_error,
            TerminationReason::UnexpectedError => &self.drains_unexpected_error,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    #[inline]
    pub fn snapshot(&self) -> DrainMetricsSnapshot {
        DrainMetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            partitions_claimed: self.partitions_claimed.load(Ordering::Relaxed),
            tasks_dispatched: self.tasks_dispatched.load(Ordering::Relaxed),
            submissions_rejected: self.submissions_rejected.load(Ordering::Relaxed),
            drains_succeeded: self.drains_succeeded.load(Ordering::Relaxed),
            drains_channel_error: self.drains_channel_error.load(Ordering::Relaxed),
            drains_unexpected_error: self.drains_unexpected_error.load(Ordering::Relaxed),
            rows_drained: self.rows_drained.load(Ordering::Relaxed),
        }
    }

    /// Get rows drained so far (for logging)
    #[inline]
    pub fn rows_drained(&self) -> u64 {
        self.rows_drained.load(Ordering::Relaxed)
    }
}

/// Point-in-time snapshot of drain metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainMetricsSnapshot {
    /// Scheduler passes started
    pub ticks: u64,
    /// Partitions claimed by a scan
    pub partitions_claimed: u64,
    /// Drain tasks handed to the pool
    pub tasks_dispatched: u64,
    /// Submissions refused by a saturated pool
    pub submissions_rejected: u64,
    /// Drains that ran through their commit wait
    pub drains_succeeded: u64,
    /// Drains abandoned on a channel fault
    pub drains_channel_error: u64,
    /// Drains that died to an unexpected error
    pub drains_unexpected_error: u64,
    /// Rows handed to sink channels
    pub rows_drained: u64,
}

impl DrainMetricsSnapshot {
    /// Total drains that finished, whatever the reason
    #[inline]
    pub fn drains_finished(&self) -> u64 {
        self.drains_succeeded + self.drains_channel_error + self.drains_unexpected_error
    }
}
