//! Spillway Configuration
//!
//! Typed configuration sections with sensible defaults.
//! A zero-value config should just work - only specify what you need to
//! change. Loading from files or the environment is the embedding
//! application's job; this crate only defines the sections, their defaults,
//! and their validation rules.
//!
//! # Sections
//!
//! - [`BufferConfig`] - queue capacity, high-volume tables, shard count
//! - [`WalConfig`] - durable-log location and retention
//! - [`DrainConfig`] - worker pool sizing, drain quanta, wait intervals
//! - [`EngineConfig`] - everything above, composed
//!
//! # Example
//!
//! ```
//! use spillway_config::EngineConfig;
//!
//! let config = EngineConfig::default()
//!     .with_high_volume_tables(["EDR_DATA"])
//!     .with_max_shards_per_table(8);
//! config.validate().unwrap();
//! ```

mod buffer;
mod drain;
mod engine;
mod error;
mod wal;

pub use buffer::BufferConfig;
pub use drain::DrainConfig;
pub use engine::EngineConfig;
pub use error::{ConfigError, Result};
pub use wal::WalConfig;
