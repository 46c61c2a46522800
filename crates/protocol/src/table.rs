//! Destination identity: table references, partitions, queue keys
//!
//! A `RowQueueKey` names exactly one partition queue. Its `Display` form
//! doubles as the durable-log key prefix, so the on-disk layout lives here
//! and nowhere else.

use std::fmt;

/// Fully qualified destination table: (database, schema, table).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    database: String,
    schema: String,
    table: String,
}

impl TableRef {
    /// Create a table reference
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

/// Shard discriminator within one table's row stream.
///
/// Non-negative indices come from the registry's round-robin assignment.
/// `-1` is reserved for the late-arriving-rows bucket and is never produced
/// by sharding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionIndex(i64);

impl PartitionIndex {
    /// The reserved late-arriving-rows bucket
    pub const LATE_ARRIVING: PartitionIndex = PartitionIndex(-1);

    /// Create a partition index from a raw value
    #[inline]
    #[must_use]
    pub const fn new(index: i64) -> Self {
        Self(index)
    }

    /// Raw index value
    #[inline]
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Whether this is the late-arriving-rows bucket
    #[inline]
    #[must_use]
    pub const fn is_late_arriving(self) -> bool {
        self.0 == Self::LATE_ARRIVING.0
    }
}

impl fmt::Display for PartitionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one partition queue: table plus partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowQueueKey {
    table: TableRef,
    partition: PartitionIndex,
}

impl RowQueueKey {
    /// Create a queue key
    pub fn new(table: TableRef, partition: PartitionIndex) -> Self {
        Self { table, partition }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn partition(&self) -> PartitionIndex {
        self.partition
    }

    /// Durable-log key for the entry at `offset`:
    /// `"{database}.{schema}.{table}.{partition}.{offset}"`.
    pub fn log_key(&self, offset: u64) -> String {
        format!("{}.{}", self, offset)
    }

    /// Durable-log key prefix covering every offset of this queue.
    pub fn log_prefix(&self) -> String {
        format!("{}.", self)
    }
}

impl fmt::Display for RowQueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.partition)
    }
}
