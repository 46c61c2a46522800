//! A single partition's pending-row queue

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, warn};

use spillway_protocol::{row_from_text, row_to_text, Row, RowQueueKey};
use spillway_wal::DurableLog;

/// One buffered row plus its queue-local offset.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    /// Zero-based, strictly increasing position within this queue
    pub offset: u64,
    /// The row itself
    pub row: Row,
}

/// What happened to an enqueue batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows appended to the queue
    pub accepted: u64,
    /// Rows refused because the queue hit its cap
    pub rejected: u64,
}

/// Queue storage: bounded deque, or a cursor pair over the durable log.
enum QueueState {
    Memory {
        entries: VecDeque<QueueEntry>,
        next_offset: u64,
    },
    Wal {
        log: Arc<DurableLog>,
        /// Offset the next accepted row will be written at
        next_write: u64,
        /// Offset the next pop will read at; never exceeds `next_write`
        next_read: u64,
    },
}

/// Ordered pending-row queue for one partition.
///
/// Appended to by any number of producers, popped by at most one drainer
/// at a time. Offsets start at 0 and never repeat for the life of the
/// process.
pub struct RowQueue {
    key: RowQueueKey,
    max_rows: usize,
    state: Mutex<QueueState>,
}

impl RowQueue {
    /// Create an in-memory queue holding at most `max_rows` rows.
    pub fn in_memory(key: RowQueueKey, max_rows: usize) -> Self {
        Self {
            key,
            max_rows,
            state: Mutex::new(QueueState::Memory {
                entries: VecDeque::new(),
                next_offset: 0,
            }),
        }
    }

    /// Create a WAL-backed queue writing through to `log`.
    ///
    /// WAL queues are not bounded by `max_rows`; the store's TTL and size
    /// limits govern retention instead.
    pub fn wal_backed(key: RowQueueKey, max_rows: usize, log: Arc<DurableLog>) -> Self {
        Self {
            key,
            max_rows,
            state: Mutex::new(QueueState::Wal {
                log,
                next_write: 0,
                next_read: 0,
            }),
        }
    }

    /// This queue's identity.
    pub fn key(&self) -> &RowQueueKey {
        &self.key
    }

    /// Whether rows are written through to the durable log.
    pub fn is_wal_backed(&self) -> bool {
        matches!(&*self.state.lock(), QueueState::Wal { .. })
    }

    /// Append a batch.
    ///
    /// In-memory: rows are accepted one at a time until the cap is hit;
    /// the first over-cap row and every row after it in the same batch are
    /// rejected, preserving order. WAL: every row is reported accepted;
    /// rows that fail to serialize or to reach the store are logged and
    /// dropped without surfacing in the counts, and the write cursor only
    /// advances past rows that are durably stored.
    pub fn enqueue_batch(&self, rows: Vec<Row>) -> BatchOutcome {
        let total = rows.len() as u64;
        let mut state = self.state.lock();
        match &mut *state {
            QueueState::Memory {
                entries,
                next_offset,
            } => {
                let mut accepted = 0u64;
                for row in rows {
                    if entries.len() >= self.max_rows {
                        let rejected = total - accepted;
                        warn!(
                            queue = %self.key,
                            accepted,
                            rejected,
                            cap = self.max_rows,
                            "queue at capacity, rejecting remainder of batch"
                        );
                        return BatchOutcome { accepted, rejected };
                    }
                    entries.push_back(QueueEntry {
                        offset: *next_offset,
                        row,
                    });
                    *next_offset += 1;
                    accepted += 1;
                }
                BatchOutcome {
                    accepted,
                    rejected: 0,
                }
            }
            QueueState::Wal {
                log, next_write, ..
            } => {
                for row in &rows {
                    let log_key = self.key.log_key(*next_write);
                    let text = match row_to_text(row) {
                        Ok(text) => text,
                        Err(e) => {
                            error!(
                                queue = %self.key,
                                error = %e,
                                "dropping row that failed serialization"
                            );
                            continue;
                        }
                    };
                    match log.put(&log_key, &text) {
                        Ok(()) => *next_write += 1,
                        Err(e) => {
                            error!(
                                queue = %self.key,
                                key = %log_key,
                                error = %e,
                                "dropping row that failed to reach the durable log"
                            );
                        }
                    }
                }
                // The ack deliberately reports the whole batch as accepted;
                // dropped rows are visible only in the log output.
                BatchOutcome {
                    accepted: total,
                    rejected: 0,
                }
            }
        }
    }

    /// Pop the next entry in enqueue order, `None` if nothing is ready.
    ///
    /// WAL mode reads at the cursor without deleting; the cursor stays put
    /// when the store errors or the entry is missing, and skips forward
    /// when the stored text no longer decodes (the row is unrecoverable
    /// either way).
    pub fn dequeue_one(&self) -> Option<QueueEntry> {
        let mut state = self.state.lock();
        match &mut *state {
            QueueState::Memory { entries, .. } => entries.pop_front(),
            QueueState::Wal {
                log,
                next_write,
                next_read,
            } => {
                if *next_read >= *next_write {
                    return None;
                }
                let log_key = self.key.log_key(*next_read);
                match log.get(&log_key) {
                    Ok(Some(text)) => {
                        let offset = *next_read;
                        *next_read += 1;
                        match row_from_text(&text) {
                            Ok(row) => Some(QueueEntry { offset, row }),
                            Err(e) => {
                                error!(
                                    queue = %self.key,
                                    offset,
                                    error = %e,
                                    "skipping stored row that no longer decodes"
                                );
                                None
                            }
                        }
                    }
                    Ok(None) => {
                        error!(
                            queue = %self.key,
                            key = %log_key,
                            "durable log is missing an entry before the write cursor"
                        );
                        None
                    }
                    Err(e) => {
                        error!(
                            queue = %self.key,
                            key = %log_key,
                            error = %e,
                            "durable log read failed"
                        );
                        None
                    }
                }
            }
        }
    }

    /// Whether a drain would find at least one row.
    pub fn has_outstanding(&self) -> bool {
        match &*self.state.lock() {
            QueueState::Memory { entries, .. } => !entries.is_empty(),
            QueueState::Wal {
                next_write,
                next_read,
                ..
            } => next_read < next_write,
        }
    }

    /// Rows currently waiting to be drained.
    pub fn pending_rows(&self) -> u64 {
        match &*self.state.lock() {
            QueueState::Memory { entries, .. } => entries.len() as u64,
            QueueState::Wal {
                next_write,
                next_read,
                ..
            } => next_write - next_read,
        }
    }
}

impl std::fmt::Debug for RowQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowQueue")
            .field("key", &self.key)
            .field("max_rows", &self.max_rows)
            .field("wal", &self.is_wal_backed())
            .field("pending", &self.pending_rows())
            .finish()
    }
}
