//! Spillway Drain - scheduled delivery of buffered rows to sink channels
//!
//! # Architecture
//!
//! ```text
//! [BufferRegistry] --scan--> [WorkSet] --dispatch--> [JoinSet + Semaphore]
//!       |                 claim / release                    |
//!       └─ RowQueue ──pop── PartitionDrainWorker ──append──> SinkChannel
//!                                  └───── commit wait ─────────┘
//! ```
//!
//! # Key Design
//!
//! - **One drain per partition**: the work set claims a key before a task
//!   is queued and the claim holds until the task finishes, so a partition
//!   never has two drains queued or running at once
//! - **Bounded pool**: a semaphore caps concurrent drains and the
//!   submission queue on top of it is bounded too; a saturated pool
//!   rejects the submission outright rather than queueing it
//! - **Ticked scans**: a fixed interval re-scans every queue with
//!   buffered rows; missed ticks are skipped, not bunched
//! - **Bounded invocations**: a single drain holds its partition for at
//!   most a duration budget or a row budget, then waits for the sink to
//!   report the last sent offset as committed before letting go

mod error;
mod metrics;
mod scheduler;
mod work_set;
mod worker;

pub use error::DrainTaskError;
pub use metrics::{DrainMetrics, DrainMetricsSnapshot};
pub use scheduler::DrainScheduler;
pub use work_set::WorkSet;
pub use worker::{CommitWaitOutcome, PartitionDrainWorker, TerminationReason};

#[cfg(test)]
mod worker_test;
