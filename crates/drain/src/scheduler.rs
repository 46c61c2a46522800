//! Drain scheduler - ticked scans over the buffer registry
//!
//! Every tick the scheduler reaps finished drain tasks, claims queues
//! that have buffered rows, and hands each claimed queue to the bounded
//! drain pool. A claim that cannot be handed over because the pool is
//! saturated stays claimed and is never retried; the partition sits
//! parked until the process restarts. Holding the claim is what keeps a
//! partition from ever having two drains at once.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use spillway_buffer::BufferRegistry;
use spillway_channel::ChannelRegistry;
use spillway_config::DrainConfig;

use crate::metrics::DrainMetrics;
use crate::work_set::WorkSet;
use crate::worker::PartitionDrainWorker;

/// Schedules partition drains over every buffered row queue.
///
/// Cloning is cheap; clones share the same scheduler state.
#[derive(Clone)]
pub struct DrainScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<BufferRegistry>,
    worker: PartitionDrainWorker,
    work_set: WorkSet,
    /// Caps drains actually running; queued submissions wait on it
    workers: Arc<Semaphore>,
    /// Running plus waiting submissions tolerated before rejecting
    max_in_flight: usize,
    tick_interval: Duration,
    metrics: Arc<DrainMetrics>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DrainScheduler {
    /// Create a scheduler over the given buffers and channels.
    ///
    /// `epoch_millis` is stamped into every offset token the drains emit.
    pub fn new(
        registry: Arc<BufferRegistry>,
        channels: Arc<ChannelRegistry>,
        epoch_millis: u64,
        config: DrainConfig,
    ) -> Self {
        let metrics = Arc::new(DrainMetrics::new());
        let worker = PartitionDrainWorker::new(
            epoch_millis,
            channels,
            config.clone(),
            Arc::clone(&metrics),
        );

        Self {
            inner: Arc::new(Inner {
                registry,
                worker,
                work_set: WorkSet::new(),
                workers: Arc::new(Semaphore::new(config.worker_count)),
                max_in_flight: config.max_in_flight(),
                tick_interval: config.tick_interval,
                metrics,
                cancel: CancellationToken::new(),
                handle: Mutex::new(None),
            }),
        }
    }

    /// Spawn the tick loop. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut handle = self.inner.handle.lock();
        if handle.is_some() {
            tracing::warn!("drain scheduler already started");
            return;
        }

        let scheduler = self.clone();
        *handle = Some(tokio::spawn(async move { scheduler.run().await }));
    }

    /// Stop the tick loop and wait for in-flight drains to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "drain scheduler task failed during shutdown");
            }
        }
    }

    /// Scheduler metrics, shared with its drain workers.
    #[inline]
    pub fn metrics(&self) -> &DrainMetrics {
        &self.inner.metrics
    }

    /// Partitions with a drain queued, running, or parked.
    pub fn claimed_partitions(&self) -> usize {
        self.inner.work_set.claimed_count()
    }

    async fn run(&self) {
        let mut interval = tokio::time::interval(self.inner.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tasks = JoinSet::new();

        tracing::info!(
            tick_interval_ms = self.inner.tick_interval.as_millis() as u64,
            max_in_flight = self.inner.max_in_flight,
            "drain scheduler started"
        );

        loop {
            tokio::select! {
                _ = self.inner.cancel.cancelled() => {
                    tracing::info!("drain scheduler received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    self.pass(&mut tasks);
                }
            }
        }

        // Let in-flight drains run to completion before returning.
        while let Some(res) = tasks.join_next().await {
            match res {
                Err(e) if e.is_panic() => tracing::error!(error = %e, "drain task panicked"),
                _ => {}
            }
        }

        let snapshot = self.inner.metrics.snapshot();
        tracing::info!(
            ticks = snapshot.ticks,
            drains_succeeded = snapshot.drains_succeeded,
            drains_channel_error = snapshot.drains_channel_error,
            drains_unexpected_error = snapshot.drains_unexpected_error,
            rows_drained = snapshot.rows_drained,
            "drain scheduler stopped"
        );
    }

    /// Run one scheduling pass: reap finished tasks, claim queues with
    /// buffered rows, dispatch the claims to the pool.
    pub fn pass(&self, tasks: &mut JoinSet<()>) {
        self.inner.metrics.record_tick();
        self.reap(tasks);
        self.scan();
        self.dispatch(tasks);
    }

    /// Collect finished drain tasks so the in-flight count stays honest.
    fn reap(&self, tasks: &mut JoinSet<()>) {
        while let Some(res) = tasks.try_join_next() {
            match res {
                Err(e) if e.is_panic() => tracing::error!(error = %e, "drain task panicked"),
                _ => {}
            }
        }
    }

    /// Claim every queue that has rows and no drain queued or in flight.
    fn scan(&self) {
        self.inner.registry.for_each(|key, queue| {
            if queue.has_outstanding() && self.inner.work_set.try_claim(key) {
                tracing::trace!(key = %key, "claimed partition for drain");
                self.inner.metrics.record_claimed();
            }
        });
    }

    /// Hand claimed queues to the pool, bounded by `max_in_flight`.
    fn dispatch(&self, tasks: &mut JoinSet<()>) {
        for key in self.inner.work_set.take_pending() {
            if tasks.len() >= self.inner.max_in_flight {
                tracing::warn!(
                    key = %key,
                    in_flight = tasks.len(),
                    "drain pool saturated, submission rejected; partition stays parked until restart"
                );
                self.inner.metrics.record_rejected();
                continue;
            }

            let Some(queue) = self.inner.registry.get(&key) else {
                tracing::warn!(key = %key, "claimed partition has no queue, releasing");
                self.inner.work_set.release(&key);
                continue;
            };

            self.inner.metrics.record_dispatched();
            let inner = Arc::clone(&self.inner);
            tasks.spawn(async move {
                let _permit = match Arc::clone(&inner.workers).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // Semaphore closed; nothing will run, free the key.
                        inner.work_set.release(&key);
                        return;
                    }
                };

                let reason = inner.worker.drain(queue.as_ref()).await;
                tracing::debug!(key = %key, reason = %reason, "drain task finished");
                inner.work_set.release(&key);
            });
        }
    }
}

impl std::fmt::Debug for DrainScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrainScheduler")
            .field("claimed_partitions", &self.claimed_partitions())
            .field("max_in_flight", &self.inner.max_in_flight)
            .finish_non_exhaustive()
    }
}
