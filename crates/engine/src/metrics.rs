//! Ingest-side metrics
//!
//! Atomic counters for the enqueue path. Drain-side counters live with
//! the drain scheduler.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for rows entering the engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Rows accepted into a queue
    rows_enqueued: AtomicU64,

    /// Rows refused by a queue at capacity
    rows_rejected: AtomicU64,

    /// Request bodies that did not parse as rows
    parse_failures: AtomicU64,
}

impl EngineMetrics {
    /// Create a new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            rows_enqueued: AtomicU64::new(0),
            rows_rejected: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
        }
    }

    /// Record the outcome of one enqueued batch
    #[inline]
    pub fn record_batch(&self, accepted: u64, rejected: u64) {
        self.rows_enqueued.fetch_add(accepted, Ordering::Relaxed);
        self.rows_rejected.fetch_add(rejected, Ordering::Relaxed);
    }

    /// Record a request body that failed to parse
    #[inline]
    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get rows enqueued so far (for logging)
    #[inline]
    pub fn rows_enqueued(&self) -> u64 {
        self.rows_enqueued.load(Ordering::Relaxed)
    }

    /// Get a point-in-time copy of all counters
    #[inline]
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            rows_enqueued: self.rows_enqueued.load(Ordering::Relaxed),
            rows_rejected: self.rows_rejected.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of ingest metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineMetricsSnapshot {
    /// Rows accepted into a queue
    pub rows_enqueued: u64,
    /// Rows refused by a queue at capacity
    pub rows_rejected: u64,
    /// Request bodies that did not parse
    pub parse_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_accumulate() {
        let metrics = EngineMetrics::new();

        metrics.record_batch(5, 0);
        metrics.record_batch(2, 3);
        metrics.record_parse_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rows_enqueued, 7);
        assert_eq!(snapshot.rows_rejected, 3);
        assert_eq!(snapshot.parse_failures, 1);
    }
}
