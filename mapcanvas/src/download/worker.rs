//! Fetch worker slots.
//!
//! A worker is a slot in the download pool: idle, or fetching exactly one
//! tile. The coordinator owns all workers and flips their state under its
//! lock; the fetch itself runs as a tokio task.

use std::fmt;

use crate::coord::TileRequest;

/// State of a fetch worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fetching(TileRequest),
}

/// Attempted to start a fetch on a busy worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerBusy {
    pub worker: usize,
    pub current: TileRequest,
}

impl fmt::Display for WorkerBusy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {} is already fetching {}", self.worker, self.current)
    }
}

impl std::error::Error for WorkerBusy {}

/// One slot of the download pool.
#[derive(Debug, Clone)]
pub struct FetchWorker {
    id: usize,
    state: WorkerState,
}

impl FetchWorker {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            state: WorkerState::Idle,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == WorkerState::Idle
    }

    /// The tile being fetched, if any.
    pub fn current(&self) -> Option<TileRequest> {
        match self.state {
            WorkerState::Idle => None,
            WorkerState::Fetching(request) => Some(request),
        }
    }

    /// Marks the worker busy with `request`.
    pub fn begin(&mut self, request: TileRequest) -> Result<(), WorkerBusy> {
        match self.state {
            WorkerState::Idle => {
                self.state = WorkerState::Fetching(request);
                Ok(())
            }
            WorkerState::Fetching(current) => Err(WorkerBusy {
                worker: self.id,
                current,
            }),
        }
    }

    /// Returns the worker to idle, yielding the tile it was fetching.
    pub fn finish(&mut self) -> Option<TileRequest> {
        let finished = self.current();
        self.state = WorkerState::Idle;
        finished
    }
}
