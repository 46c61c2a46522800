//! Queue registry and partition assignment

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use spillway_config::BufferConfig;
use spillway_protocol::{PartitionIndex, RowQueueKey, TableRef};
use spillway_wal::DurableLog;

use crate::queue::RowQueue;

/// Creates and looks up partition queues.
///
/// Queues are created lazily on first use of their key and live for the
/// process lifetime. For tables in the configured high-volume set, each
/// `queue_for` call advances a per-table round-robin counter so batches
/// spread across `max_shards_per_table` partitions; every other table gets
/// partition 0.
pub struct BufferRegistry {
    queues: DashMap<RowQueueKey, Arc<RowQueue>>,
    shard_counters: DashMap<TableRef, AtomicU64>,
    /// Uppercased for case-insensitive matching
    high_volume: HashSet<String>,
    max_shards: u64,
    max_rows: usize,
    wal: Option<Arc<DurableLog>>,
}

impl BufferRegistry {
    /// Build a registry; passing a durable log makes every queue
    /// WAL-backed.
    pub fn new(config: &BufferConfig, wal: Option<Arc<DurableLog>>) -> Self {
        let high_volume = config
            .high_volume_tables
            .iter()
            .map(|t| t.to_ascii_uppercase())
            .collect();
        Self {
            queues: DashMap::new(),
            shard_counters: DashMap::new(),
            high_volume,
            max_shards: u64::from(config.max_shards_per_table),
            max_rows: config.max_row_count,
            wal,
        }
    }

    /// Queue for the next batch to this table, creating it if absent.
    ///
    /// The partition is assigned here: round-robin for high-volume tables,
    /// 0 otherwise.
    pub fn queue_for(&self, database: &str, schema: &str, table: &str) -> Arc<RowQueue> {
        let table_ref = TableRef::new(database, schema, table);
        let partition = self.assign_partition(&table_ref);
        self.get_or_create(RowQueueKey::new(table_ref, partition))
    }

    /// The late-arriving-rows bucket for a table (reserved partition -1),
    /// creating it if absent.
    pub fn late_arrival_queue(&self, database: &str, schema: &str, table: &str) -> Arc<RowQueue> {
        let table_ref = TableRef::new(database, schema, table);
        self.get_or_create(RowQueueKey::new(table_ref, PartitionIndex::LATE_ARRIVING))
    }

    /// Lookup-only access to a specific partition's queue.
    pub fn queue_at(
        &self,
        database: &str,
        schema: &str,
        table: &str,
        partition: PartitionIndex,
    ) -> Option<Arc<RowQueue>> {
        let key = RowQueueKey::new(TableRef::new(database, schema, table), partition);
        self.get(&key)
    }

    /// Lookup-only access by key.
    pub fn get(&self, key: &RowQueueKey) -> Option<Arc<RowQueue>> {
        self.queues.get(key).map(|queue| Arc::clone(&queue))
    }

    /// Visit every registered queue (scheduler scan path).
    pub fn for_each(&self, mut f: impl FnMut(&RowQueueKey, &Arc<RowQueue>)) {
        for entry in self.queues.iter() {
            f(entry.key(), entry.value());
        }
    }

    /// Number of registered queues.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Whether no queue has been created yet.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Rows waiting across all queues.
    pub fn total_pending_rows(&self) -> u64 {
        self.queues
            .iter()
            .map(|entry| entry.value().pending_rows())
            .sum()
    }

    fn assign_partition(&self, table: &TableRef) -> PartitionIndex {
        if !self.high_volume.contains(&table.table().to_ascii_uppercase()) {
            return PartitionIndex::new(0);
        }
        let counter = self
            .shard_counters
            .entry(table.clone())
            .or_insert_with(|| AtomicU64::new(0));
        let turn = counter.fetch_add(1, Ordering::Relaxed) + 1;
        PartitionIndex::new((turn % self.max_shards) as i64)
    }

    fn get_or_create(&self, key: RowQueueKey) -> Arc<RowQueue> {
        // Fast path: the queue almost always exists already.
        if let Some(queue) = self.queues.get(&key) {
            return Arc::clone(&queue);
        }
        let entry = self.queues.entry(key.clone()).or_insert_with(|| {
            debug!(queue = %key, wal = self.wal.is_some(), "creating partition queue");
            Arc::new(self.make_queue(key))
        });
        Arc::clone(entry.value())
    }

    fn make_queue(&self, key: RowQueueKey) -> RowQueue {
        match &self.wal {
            Some(log) => RowQueue::wal_backed(key, self.max_rows, Arc::clone(log)),
            None => RowQueue::in_memory(key, self.max_rows),
        }
    }
}

impl std::fmt::Debug for BufferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferRegistry")
            .field("queues", &self.queues.len())
            .field("max_shards", &self.max_shards)
            .field("wal", &self.wal.is_some())
            .finish()
    }
}
