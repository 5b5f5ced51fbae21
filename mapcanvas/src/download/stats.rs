//! Download counters.
//!
//! ```text
//! DownloadCoordinator ─────► DownloadStats ─────► DownloadSnapshot ─────► CLI / logs
//!                            (atomic counters)   (point-in-time copy)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Lock-free counters updated by the download coordinator.
#[derive(Debug, Default)]
pub struct DownloadStats {
    requested: AtomicU64,
    deduplicated: AtomicU64,
    queued: AtomicU64,
    evicted: AtomicU64,
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl DownloadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&self) {
        self.requested.fetch_add(1, Ordering::Relaxed);
    }

    /// Request already cached, queued or in flight.
    pub(crate) fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);
    }

    /// A fetch finished; `stored` is false when it produced no tile.
    pub(crate) fn record_completion(&self, stored: bool) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        if stored {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> DownloadSnapshot {
        DownloadSnapshot {
            requested: self.requested.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Download counters at one moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSnapshot {
    /// Calls to `request`, including ignored ones
    pub requested: u64,
    /// Requests ignored because the tile was fresh, queued or in flight
    pub deduplicated: u64,
    /// Requests added to the backlog
    pub queued: u64,
    /// Requests dropped from a full backlog
    pub evicted: u64,
    /// Fetches started
    pub dispatched: u64,
    /// Fetches that stored a tile
    pub completed: u64,
    /// Fetches that produced nothing
    pub failed: u64,
    /// Fetches currently running
    pub in_flight: usize,
    /// Most fetches ever running at once
    pub peak_in_flight: usize,
}

impl fmt::Display for DownloadSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested, {} queued, {} evicted, {} downloaded, {} failed (peak {} concurrent)",
            self.requested,
            self.queued,
            self.evicted,
            self.completed,
            self.failed,
            self.peak_in_flight
        )
    }
}
