//! The ingestion engine facade

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use spillway_buffer::BufferRegistry;
use spillway_channel::{ChannelOpener, ChannelRegistry};
use spillway_config::EngineConfig;
use spillway_drain::{DrainMetrics, DrainScheduler};
use spillway_protocol::{parse_rows, EnqueueAck, Row};
use spillway_wal::DurableLog;

use crate::error::EngineError;
use crate::metrics::EngineMetrics;

/// Accepts row batches, buffers them per partition, and drains them in
/// the background into sink channels.
///
/// One engine per process. Its epoch (milliseconds since the Unix epoch,
/// taken at construction) is stamped into every offset token it emits,
/// which is how a sink can tell this process's tokens from an earlier or
/// later incarnation's.
pub struct IngestEngine {
    epoch_millis: u64,
    registry: Arc<BufferRegistry>,
    channels: Arc<ChannelRegistry>,
    scheduler: DrainScheduler,
    wal: Option<Arc<DurableLog>>,
    metrics: EngineMetrics,
}

impl IngestEngine {
    /// Build an engine from a validated config and a channel opener.
    ///
    /// Opens the durable log if one is configured; every queue then
    /// writes through to it.
    pub fn new(config: EngineConfig, opener: Arc<dyn ChannelOpener>) -> Result<Self, EngineError> {
        config.validate()?;

        let epoch_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);

        let wal = match &config.wal {
            Some(wal_config) => Some(Arc::new(DurableLog::open(wal_config)?)),
            None => None,
        };

        let registry = Arc::new(BufferRegistry::new(&config.buffer, wal.clone()));
        let channels = Arc::new(ChannelRegistry::new(opener));
        let scheduler = DrainScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&channels),
            epoch_millis,
            config.drain.clone(),
        );

        tracing::info!(
            epoch_millis,
            wal = wal.is_some(),
            high_volume_tables = config.buffer.high_volume_tables.len(),
            drain_workers = config.drain.worker_count,
            "ingest engine ready"
        );

        Ok(Self {
            epoch_millis,
            registry,
            channels,
            scheduler,
            wal,
            metrics: EngineMetrics::new(),
        })
    }

    /// Start the background drain scheduler.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stop draining, wait for in-flight drains, and close every channel.
    ///
    /// Rows still buffered in memory at this point are dropped with the
    /// process; rows in the durable log survive it.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        self.channels.close_all().await;

        tracing::info!(
            rows_enqueued = self.metrics.rows_enqueued(),
            rows_drained = self.scheduler.metrics().rows_drained(),
            rows_buffered = self.buffered_row_count(),
            "ingest engine stopped"
        );
    }

    /// Accept a batch of rows for a table.
    ///
    /// The body must be a JSON object (one row) or an array of objects.
    /// A body that parses goes to the table's assigned partition queue;
    /// the ack reports how many rows the queue took. A body that does
    /// not parse is refused whole.
    pub fn enqueue(&self, database: &str, schema: &str, table: &str, body: &str) -> EnqueueAck {
        let rows = match parse_rows(body) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    database,
                    schema,
                    table,
                    error = %e,
                    "rejecting request body that does not parse as rows"
                );
                self.metrics.record_parse_failure();
                return EnqueueAck::parse_failure();
            }
        };

        let queue = self.registry.queue_for(database, schema, table);
        let outcome = queue.enqueue_batch(rows);
        self.metrics.record_batch(outcome.accepted, outcome.rejected);
        EnqueueAck::counts(outcome.accepted, outcome.rejected)
    }

    /// Accept already-parsed rows into a table's late-arriving bucket
    /// (the reserved partition -1).
    ///
    /// Used when re-injecting rows recovered from another process's
    /// durable log; they must not interleave with live partitions.
    pub fn enqueue_late_arrivals(
        &self,
        database: &str,
        schema: &str,
        table: &str,
        rows: Vec<Row>,
    ) -> EnqueueAck {
        let queue = self.registry.late_arrival_queue(database, schema, table);
        let outcome = queue.enqueue_batch(rows);
        self.metrics.record_batch(outcome.accepted, outcome.rejected);
        EnqueueAck::counts(outcome.accepted, outcome.rejected)
    }

    /// Rows sitting in queues, waiting for a drain.
    pub fn buffered_row_count(&self) -> u64 {
        self.registry.total_pending_rows()
    }

    /// The epoch stamped into this process's offset tokens.
    #[inline]
    pub fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }

    /// Ingest-side metrics.
    #[inline]
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Drain-side metrics, shared with the scheduler.
    #[inline]
    pub fn drain_metrics(&self) -> &DrainMetrics {
        self.scheduler.metrics()
    }

    /// The durable log, when the engine was configured with one.
    pub fn durable_log(&self) -> Option<&Arc<DurableLog>> {
        self.wal.as_ref()
    }
}

impl std::fmt::Debug for IngestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestEngine")
            .field("epoch_millis", &self.epoch_millis)
            .field("wal", &self.wal.is_some())
            .field("buffered_rows", &self.buffered_row_count())
            .finish_non_exhaustive()
    }
}
