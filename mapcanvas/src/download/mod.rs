//! Tile download scheduling.
//!
//! - [`DownloadQueue`]: bounded LIFO backlog
//! - [`FetchWorker`]: one slot of the download pool
//! - [`DownloadCoordinator`]: dedup, dispatch and completion
//! - [`DownloadStats`]: counters for logs and the CLI

mod coordinator;
mod queue;
mod stats;
mod worker;

pub use coordinator::{DownloadConfig, DownloadCoordinator, RequestOutcome, TileAvailable};
pub use queue::{DownloadQueue, PushOutcome, DEFAULT_BACKLOG};
pub use stats::{DownloadSnapshot, DownloadStats};
pub use worker::{FetchWorker, WorkerBusy, WorkerState};
