//! Drain scheduler and worker configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Configuration for the drain scheduler and its worker pool
///
/// All fields have sensible defaults - you only need to specify what you
/// want to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    /// Concurrent drain workers (one partition per worker at a time).
    /// Default: 4
    pub worker_count: usize,

    /// Submissions allowed to wait for a free worker beyond `worker_count`.
    /// A submission arriving past this bound is dropped.
    /// Default: 10
    pub submit_queue_depth: usize,

    /// Scheduler scan interval.
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Wall-clock budget for one drain invocation.
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub max_drain_duration: Duration,

    /// Row budget for one drain invocation.
    /// Default: 10000
    pub max_records_per_drain: u64,

    /// How long to wait for the sink to commit the last sent offset after
    /// a drain quantum ends.
    /// Default: 120s
    #[serde(with = "humantime_serde")]
    pub max_commit_wait: Duration,

    /// Sleep before re-checking a momentarily empty queue mid-drain.
    /// Default: 10ms
    #[serde(with = "humantime_serde")]
    pub empty_poll_interval: Duration,

    /// Interval between committed-offset polls during the commit wait.
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub commit_poll_interval: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            submit_queue_depth: 10,
            tick_interval: Duration::from_secs(1),
            max_drain_duration: Duration::from_secs(10),
            max_records_per_drain: 10_000,
            max_commit_wait: Duration::from_secs(120),
            empty_poll_interval: Duration::from_millis(10),
            commit_poll_interval: Duration::from_secs(1),
        }
    }
}

impl DrainConfig {
    /// Set the worker pool size
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the submission queue depth
    pub fn with_submit_queue_depth(mut self, depth: usize) -> Self {
        self.submit_queue_depth = depth;
        self
    }

    /// Set the scheduler tick interval
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the per-invocation duration budget
    pub fn with_max_drain_duration(mut self, duration: Duration) -> Self {
        self.max_drain_duration = duration;
        self
    }

    /// Set the per-invocation row budget
    pub fn with_max_records_per_drain(mut self, records: u64) -> Self {
        self.max_records_per_drain = records;
        self
    }

    /// Set the commit wait budget
    pub fn with_max_commit_wait(mut self, budget: Duration) -> Self {
        self.max_commit_wait = budget;
        self
    }

    /// Set the empty-queue poll interval
    pub fn with_empty_poll_interval(mut self, interval: Duration) -> Self {
        self.empty_poll_interval = interval;
        self
    }

    /// Set the committed-offset poll interval
    pub fn with_commit_poll_interval(mut self, interval: Duration) -> Self {
        self.commit_poll_interval = interval;
        self
    }

    /// Total in-flight drain submissions tolerated at once
    /// (running plus waiting)
    pub fn max_in_flight(&self) -> usize {
        self.worker_count + self.submit_queue_depth
    }

    /// Check the section for unusable values
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(ConfigError::invalid(
                "drain.worker_count",
                "must be at least 1",
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::invalid(
                "drain.tick_interval",
                "must be non-zero",
            ));
        }
        if self.empty_poll_interval.is_zero() {
            return Err(ConfigError::invalid(
                "drain.empty_poll_interval",
                "must be non-zero",
            ));
        }
        if self.commit_poll_interval.is_zero() {
            return Err(ConfigError::invalid(
                "drain.commit_poll_interval",
                "must be non-zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DrainConfig::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.submit_queue_depth, 10);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.max_in_flight(), 14);
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(DrainConfig::default().with_worker_count(0).validate().is_err());
    }

    #[test]
    fn test_zero_tick_rejected() {
        assert!(DrainConfig::default()
            .with_tick_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_deserialize_humantime_durations() {
        let config: DrainConfig = serde_json::from_str(
            r#"{"tick_interval": "250ms", "max_commit_wait": "2m", "worker_count": 2}"#,
        )
        .unwrap();
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.max_commit_wait, Duration::from_secs(120));
        assert_eq!(config.worker_count, 2);
        // untouched fields keep their defaults
        assert_eq!(config.empty_poll_interval, Duration::from_millis(10));
    }
}
