//! Bounded LIFO backlog of pending tile requests.
//!
//! ```text
//!   evict ◄── front [oldest ... newest] back ──► pop (dispatch)
//!                                        ▲
//!                                     push
//! ```
//!
//! The most recently requested tile is served first, since it is most
//! likely still on screen. When the backlog is full, the oldest request is
//! dropped to make room.

use std::collections::VecDeque;

use crate::coord::TileRequest;

/// Default backlog capacity.
pub const DEFAULT_BACKLOG: usize = 150;

/// What happened when a request was pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended; nothing was dropped.
    Queued,
    /// Already pending; moved to the back.
    Promoted,
    /// Appended after dropping the oldest pending request.
    Evicted(TileRequest),
}

/// Pending tile requests, bounded and without duplicates.
#[derive(Debug, Clone)]
pub struct DownloadQueue {
    pending: VecDeque<TileRequest>,
    capacity: usize,
}

impl DownloadQueue {
    /// Creates an empty queue.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a request as the newest entry.
    pub fn push(&mut self, request: TileRequest) -> PushOutcome {
        if let Some(index) = self.pending.iter().position(|r| *r == request) {
            self.pending.remove(index);
            self.pending.push_back(request);
            return PushOutcome::Promoted;
        }

        let evicted = if self.pending.len() >= self.capacity {
            self.pending.pop_front()
        } else {
            None
        };
        self.pending.push_back(request);

        match evicted {
            Some(old) => PushOutcome::Evicted(old),
            None => PushOutcome::Queued,
        }
    }

    /// Removes and returns the newest request.
    pub fn pop(&mut self) -> Option<TileRequest> {
        self.pending.pop_back()
    }

    pub fn contains(&self, request: &TileRequest) -> bool {
        self.pending.contains(request)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every pending request, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Pending requests from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TileRequest> {
        self.pending.iter()
    }
}

impl Default for DownloadQueue {
    fn default() -> Self {
        Self::new(DEFAULT_BACKLOG)
    }
}
