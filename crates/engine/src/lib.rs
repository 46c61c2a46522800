//! Spillway Engine - the buffered ingestion facade
//!
//! Wires the whole pipeline together behind one type: accept row batches
//! per table, buffer them in per-partition queues (optionally written
//! through to a durable log), and drain them in the background into sink
//! channels with strictly ordered offset tokens.
//!
//! # Architecture
//!
//! ```text
//!  enqueue ──> [BufferRegistry] ──> RowQueue (per table.partition)
//!                                       │ optional write-through
//!                                  [DurableLog]
//!                                       │
//!  tick ─────> [DrainScheduler] ──pop──/ append ──> [SinkChannel]
//!                                                    commit wait
//! ```
//!
//! # Example
//!
//! ```ignore
//! use spillway_engine::{EngineConfig, IngestEngine};
//!
//! let engine = IngestEngine::new(EngineConfig::default(), opener)?;
//! engine.start();
//!
//! let ack = engine.enqueue("db", "public", "events", r#"[{"a": 1}]"#);
//! assert_eq!(ack.rows_enqueued, 1);
//!
//! engine.shutdown().await;
//! ```

mod engine;
mod error;
mod metrics;

pub use engine::IngestEngine;
pub use error::EngineError;
pub use metrics::{EngineMetrics, EngineMetricsSnapshot};

// Re-export key types from dependencies for convenience
pub use spillway_channel::{
    AppendOutcome, ChannelError, ChannelOpener, ChannelRegistry, SinkChannel,
};
pub use spillway_config::EngineConfig;
pub use spillway_protocol::{EnqueueAck, Row};
