//! Spillway Buffer - partition row queues and their registry
//!
//! Producers append row batches to per-partition queues and get an
//! immediate accept/reject count back; the drain side pops rows one at a
//! time in strict enqueue order. Queues are either purely in-memory
//! (bounded, rows lost on crash) or WAL-backed (unbounded, every accepted
//! row durable before the ack).
//!
//! # Design
//!
//! - One mutex per queue guards the append/pop state; the critical section
//!   is O(1) plus, in WAL mode, one RocksDB write.
//! - Pop-side exclusivity (at most one drainer per queue) is NOT enforced
//!   here - the drain scheduler's work set guarantees it. The queue only
//!   guarantees that whatever interleaving happens, offsets come out in
//!   order, each at most once.
//! - The registry hands out queues keyed by (database, schema, table,
//!   partition), assigning partitions round-robin for configured
//!   high-volume tables and partition 0 for everything else.

mod queue;
mod registry;

pub use queue::{BatchOutcome, QueueEntry, RowQueue};
pub use registry::BufferRegistry;
