//! Spillway WAL - durable log backing WAL-mode partition queues
//!
//! A thin wrapper over RocksDB exposing exactly what the buffering core
//! needs: string-keyed puts and gets plus a prefix purge. Keys embed table
//! identity, partition, and offset (the layout lives in
//! `spillway_protocol::RowQueueKey`), so one store serves every queue.
//!
//! # Design
//!
//! - The log is append-only from the queues' point of view: reads never
//!   delete. Retention comes from the store-level TTL and from explicit
//!   prefix purges issued by operational tooling.
//! - Writes are fsynced by default; losing acknowledged rows on power loss
//!   is exactly what WAL mode exists to prevent.

mod error;
mod store;

pub use error::StoreError;
pub use store::DurableLog;
