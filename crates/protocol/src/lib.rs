//! Spillway Protocol - core vocabulary for the ingestion gateway
//!
//! This crate provides the foundational types that flow through the pipeline:
//! - `Row` - an ordered field-name-to-value mapping, opaque to the core
//! - `TableRef` / `PartitionIndex` / `RowQueueKey` - destination identity
//! - `OffsetToken` - position-plus-epoch token attached to every sent row
//! - `EnqueueAck` - the accept/reject counts returned to producers
//!
//! # Design Principles
//!
//! - **Order-preserving rows**: rows keep their JSON field order end to end
//!   (`serde_json` with `preserve_order`), so what a producer sent is what
//!   the sink receives.
//! - **Strict parsing**: offset tokens and payload bodies either parse fully
//!   or fail with a typed error; nothing degrades to a silent default.
//! - **Cheap keys**: queue keys are owned strings plus an integer partition,
//!   hashable and printable, with the durable-log key layout in one place.

mod ack;
mod error;
mod row;
mod table;
mod token;

pub use ack::{EnqueueAck, PARSE_FAILURE_MESSAGE};
pub use error::ProtocolError;
pub use row::{Row, parse_rows, row_from_text, row_to_text};
pub use table::{PartitionIndex, RowQueueKey, TableRef};
pub use token::OffsetToken;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
