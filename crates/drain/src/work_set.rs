//! Claimed-partition tracking for the drain scheduler
//!
//! A partition must never have two drains queued or running at once. The
//! work set enforces that: a scan claims a key exactly once, and the key
//! stays claimed until whoever ran (or failed to run) the drain releases
//! it. Exclusivity is deliberately valued over liveness here; a key whose
//! drain never runs stays claimed rather than risking a second drain.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

use spillway_protocol::RowQueueKey;

/// Tracks which row queues have a drain queued or in flight.
#[derive(Debug, Default)]
pub struct WorkSet {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Keys with a drain queued or in flight
    claimed: HashSet<RowQueueKey>,
    /// Claimed keys not yet handed to a drain task, in claim order
    pending: VecDeque<RowQueueKey>,
}

impl WorkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a key for draining.
    ///
    /// Returns `false` if the key already has a drain queued or in flight.
    /// On success the key joins the pending queue until [`take_pending`]
    /// hands it out.
    ///
    /// [`take_pending`]: WorkSet::take_pending
    pub fn try_claim(&self, key: &RowQueueKey) -> bool {
        let mut inner = self.inner.lock();
        if !inner.claimed.insert(key.clone()) {
            return false;
        }
        inner.pending.push_back(key.clone());
        true
    }

    /// Take every pending key, oldest claim first.
    ///
    /// The keys stay claimed; the caller must [`release`] each one once
    /// its drain finishes, or decides it never will run.
    ///
    /// [`release`]: WorkSet::release
    pub fn take_pending(&self) -> Vec<RowQueueKey> {
        self.inner.lock().pending.drain(..).collect()
    }

    /// Release a key so a later scan can claim it again.
    pub fn release(&self, key: &RowQueueKey) {
        self.inner.lock().claimed.remove(key);
    }

    /// Whether the key currently has a drain queued or in flight.
    pub fn is_claimed(&self, key: &RowQueueKey) -> bool {
        self.inner.lock().claimed.contains(key)
    }

    /// Number of claimed keys.
    pub fn claimed_count(&self) -> usize {
        self.inner.lock().claimed.len()
    }

    /// Number of keys waiting to be handed to a drain task.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }
}
