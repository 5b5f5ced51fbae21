//! Download coordinator: backlog, worker pool and completion handling.
//!
//! The [`DownloadCoordinator`] accepts tile requests from render passes,
//! deduplicates them against the cache and the pool, and keeps at most
//! `parallelism` fetches running against the tile server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      DownloadCoordinator                         │
//! │                                                                  │
//! │  request ──► ┌──────────────┐                                    │
//! │              │ Dedup check  │──► fresh / in flight ──► ignore    │
//! │              └──────┬───────┘                                    │
//! │                     ▼                                            │
//! │              ┌──────────────┐                                    │
//! │              │ LIFO backlog │──► full ──► drop oldest            │
//! │              └──────┬───────┘                                    │
//! │                     ▼ dispatch (idle worker + pending request)   │
//! │              ┌──────────────┐                                    │
//! │              │ Fetch worker │──► tokio task ──► TileFetcher      │
//! │              └──────┬───────┘                                    │
//! │                     ▼ completion                                 │
//! │              ┌──────────────┐                                    │
//! │              │ Cache write  │──► TileAvailable event             │
//! │              └──────────────┘                                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Serialization
//!
//! Request, dispatch and completion all run under one mutex. Dedup checks,
//! backlog mutation, worker state changes and the cache write for a
//! completed fetch therefore never interleave. Network I/O happens outside
//! the lock.
//!
//! # Runtime
//!
//! Fetches are spawned on the runtime handle given at construction, which
//! must outlive the coordinator. [`stop`](DownloadCoordinator::stop) blocks
//! the calling thread and must not be called from inside that runtime; use
//! [`shutdown`](DownloadCoordinator::shutdown) from async code.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, trace, warn};

use crate::cache::TileCache;
use crate::coord::{tiles_per_axis, TileKey, TileRequest};
use crate::download::queue::{DownloadQueue, PushOutcome, DEFAULT_BACKLOG};
use crate::download::stats::{DownloadSnapshot, DownloadStats};
use crate::download::worker::FetchWorker;
use crate::provider::{FetchedTile, TileFetcher, TileServer, UrlTemplate};
use crate::time::{resolve_expiry, unix_now};

/// Emitted after a downloaded tile has been written to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileAvailable {
    pub key: TileKey,
}

/// How a call to [`DownloadCoordinator::request`] was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A fresh copy is already cached.
    Cached,
    /// A worker is already fetching the tile.
    InFlight,
    /// Added to the backlog.
    Queued,
    /// Already in the backlog; moved to the front of the line.
    Promoted,
    /// Outside the server's zoom range or the tile grid.
    OutOfRange,
    /// The coordinator has been stopped.
    Stopped,
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestOutcome::Cached => "cached",
            RequestOutcome::InFlight => "in flight",
            RequestOutcome::Queued => "queued",
            RequestOutcome::Promoted => "promoted",
            RequestOutcome::OutOfRange => "out of range",
            RequestOutcome::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Maximum pending requests before the oldest is dropped.
    pub backlog: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            backlog: DEFAULT_BACKLOG,
        }
    }
}

/// State guarded by the coordinator lock.
struct CoordinatorState {
    queue: DownloadQueue,
    workers: Vec<FetchWorker>,
    stopped: bool,
}

impl CoordinatorState {
    fn in_flight(&self, request: &TileRequest) -> bool {
        self.workers.iter().any(|w| w.current() == Some(*request))
    }

    fn all_idle(&self) -> bool {
        self.workers.iter().all(FetchWorker::is_idle)
    }

    /// Marks the coordinator stopped and drops the backlog.
    fn begin_stop(&mut self) -> usize {
        self.stopped = true;
        self.queue.clear()
    }
}

struct Shared<F> {
    session: Arc<str>,
    url: UrlTemplate,
    max_zoom: u8,
    min_zoom: u8,
    cache: TileCache,
    fetcher: Arc<F>,
    runtime: Handle,
    state: Mutex<CoordinatorState>,
    idle: Condvar,
    idle_notify: Notify,
    events: mpsc::UnboundedSender<TileAvailable>,
    stats: DownloadStats,
}

/// Bounded, deduplicating download scheduler for one tile server.
///
/// # Type Parameters
///
/// * `F` - Network fetcher used by the workers
pub struct DownloadCoordinator<F: TileFetcher> {
    shared: Arc<Shared<F>>,
}

impl<F: TileFetcher> DownloadCoordinator<F> {
    /// Creates a coordinator with its availability channel.
    ///
    /// The worker pool has `server.parallelism()` slots. Returns the
    /// coordinator and the receiver for [`TileAvailable`] events.
    ///
    /// # Arguments
    ///
    /// * `server` - Tile server to download from
    /// * `cache` - Cache that completed tiles are written to
    /// * `fetcher` - Network primitive
    /// * `config` - Backlog tuning
    /// * `runtime` - Runtime that fetch tasks are spawned on
    pub fn new(
        server: &TileServer,
        cache: TileCache,
        fetcher: Arc<F>,
        config: DownloadConfig,
        runtime: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<TileAvailable>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let workers = (0..server.parallelism()).map(FetchWorker::new).collect();

        let shared = Arc::new(Shared {
            session: server.session(),
            url: server.url().clone(),
            min_zoom: server.min_zoom(),
            max_zoom: server.max_zoom(),
            cache,
            fetcher,
            runtime,
            state: Mutex::new(CoordinatorState {
                queue: DownloadQueue::new(config.backlog),
                workers,
                stopped: false,
            }),
            idle: Condvar::new(),
            idle_notify: Notify::new(),
            events,
            stats: DownloadStats::new(),
        });

        debug!(
            session = %shared.session,
            workers = server.parallelism(),
            backlog = config.backlog,
            "Download coordinator created"
        );

        (Self { shared }, receiver)
    }

    /// Asks for a tile to be downloaded.
    ///
    /// Ignored when a fresh copy is cached, the tile is being fetched, or
    /// the coordinator is stopped. Otherwise the tile joins the backlog as
    /// its newest entry and idle workers are put to work.
    pub fn request(&self, request: TileRequest) -> RequestOutcome {
        let shared = &self.shared;
        shared.stats.record_request();

        if request.z < shared.min_zoom
            || request.z > shared.max_zoom
            || u64::from(request.x) >= tiles_per_axis(request.z)
            || u64::from(request.y) >= tiles_per_axis(request.z)
        {
            trace!(tile = %request, "Ignoring request outside tile grid");
            return RequestOutcome::OutOfRange;
        }

        let mut state = shared.state.lock();
        if state.stopped {
            return RequestOutcome::Stopped;
        }

        if state.in_flight(&request) {
            shared.stats.record_deduplicated();
            return RequestOutcome::InFlight;
        }

        let key = request.with_session(&shared.session);
        if shared.cache.is_fresh(&key) {
            shared.stats.record_deduplicated();
            return RequestOutcome::Cached;
        }

        let outcome = match state.queue.push(request) {
            PushOutcome::Queued => {
                shared.stats.record_queued();
                RequestOutcome::Queued
            }
            PushOutcome::Promoted => {
                shared.stats.record_deduplicated();
                RequestOutcome::Promoted
            }
            PushOutcome::Evicted(dropped) => {
                shared.stats.record_queued();
                shared.stats.record_evicted();
                debug!(dropped = %dropped, tile = %request, "Download backlog full, dropped oldest request");
                RequestOutcome::Queued
            }
        };

        dispatch(shared, &mut state);
        outcome
    }

    /// Stops accepting requests and waits for running fetches to finish.
    ///
    /// The backlog is discarded. Tiles whose fetch was already running are
    /// still written to the cache. Blocks the calling thread; must not be
    /// called from a thread driving the fetch runtime.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        let dropped = state.begin_stop();
        let running = state.workers.iter().filter(|w| !w.is_idle()).count();

        while !state.all_idle() {
            self.shared.idle.wait(&mut state);
        }

        info!(dropped, running, "Download coordinator stopped");
    }

    /// Async form of [`stop`](Self::stop).
    pub async fn shutdown(&self) {
        let mut dropped = 0;
        loop {
            let notified = self.shared.idle_notify.notified();
            {
                let mut state = self.shared.state.lock();
                dropped += state.begin_stop();
                if state.all_idle() {
                    break;
                }
            }
            notified.await;
        }

        info!(dropped, "Download coordinator stopped");
    }

    /// Waits until the backlog is empty and every worker is idle.
    ///
    /// Returns immediately if already idle. New requests arriving while
    /// waiting extend the wait.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle_notify.notified();
            {
                let state = self.shared.state.lock();
                if state.queue.is_empty() && state.all_idle() {
                    return;
                }
            }
            notified.await;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().stopped
    }

    /// Number of requests waiting in the backlog.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_queued(&self, request: &TileRequest) -> bool {
        self.shared.state.lock().queue.contains(request)
    }

    pub fn is_in_flight(&self, request: &TileRequest) -> bool {
        self.shared.state.lock().in_flight(request)
    }

    /// Tiles currently being fetched, in worker order.
    pub fn in_flight(&self) -> Vec<TileRequest> {
        self.shared
            .state
            .lock()
            .workers
            .iter()
            .filter_map(FetchWorker::current)
            .collect()
    }

    /// Size of the worker pool.
    pub fn parallelism(&self) -> usize {
        self.shared.state.lock().workers.len()
    }

    pub fn session(&self) -> &Arc<str> {
        &self.shared.session
    }

    pub fn cache(&self) -> &TileCache {
        &self.shared.cache
    }

    pub fn stats(&self) -> DownloadSnapshot {
        self.shared.stats.snapshot()
    }
}

impl<F: TileFetcher> Drop for DownloadCoordinator<F> {
    fn drop(&mut self) {
        // Running fetches finish on their own and still populate the cache.
        self.shared.state.lock().begin_stop();
    }
}

impl<F: TileFetcher> fmt::Debug for DownloadCoordinator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("session", &self.shared.session)
            .finish_non_exhaustive()
    }
}

/// Hands pending requests to idle workers until one side runs out.
///
/// Requests that became fresh in the cache while waiting are skipped.
fn dispatch<F: TileFetcher>(shared: &Arc<Shared<F>>, state: &mut CoordinatorState) {
    while !state.stopped {
        let Some(worker) = state.workers.iter().position(FetchWorker::is_idle) else {
            return;
        };

        let request = loop {
            let Some(candidate) = state.queue.pop() else {
                return;
            };
            if shared.cache.is_fresh(&candidate.with_session(&shared.session)) {
                trace!(tile = %candidate, "Skipping request cached since queued");
                continue;
            }
            break candidate;
        };

        if let Err(e) = state.workers[worker].begin(request) {
            warn!(error = %e, "Worker selected for dispatch was busy");
            return;
        }
        shared.stats.record_dispatch();

        let url = shared.url.expand(&request);
        debug!(worker, tile = %request, url = %url, "Starting tile fetch");

        // The fetch runs in its own task so a panicking fetcher still
        // completes the worker.
        let fetch_shared = Arc::clone(shared);
        let fetch = shared
            .runtime
            .spawn(async move { fetch_shared.fetcher.fetch(&url).await });
        let task_shared = Arc::clone(shared);
        shared.runtime.spawn(async move {
            let tile = match fetch.await {
                Ok(Ok(tile)) => tile,
                Ok(Err(e)) => {
                    warn!(error = %e, tile = %request, "Tile fetch failed");
                    FetchedTile::default()
                }
                Err(e) => {
                    warn!(error = %e, tile = %request, "Tile fetch task aborted");
                    FetchedTile::default()
                }
            };
            complete(&task_shared, worker, request, tile);
        });
    }
}

/// Records a finished fetch and refills the pool.
///
/// Empty payloads are not cached, so the tile stays requestable.
fn complete<F: TileFetcher>(
    shared: &Arc<Shared<F>>,
    worker: usize,
    request: TileRequest,
    tile: FetchedTile,
) {
    let mut state = shared.state.lock();

    let stored = if tile.data.is_empty() {
        debug!(tile = %request, "Fetch returned no data, not caching");
        None
    } else {
        let key = request.with_session(&shared.session);
        let expiry = resolve_expiry(tile.expires, unix_now());
        let bytes = tile.data.len();
        match shared.cache.put(&key, expiry, tile.data) {
            Ok(()) => {
                trace!(tile = %request, bytes, expiry, "Tile cached");
                Some(key)
            }
            Err(e) => {
                warn!(error = %e, tile = %request, "Failed to cache downloaded tile");
                None
            }
        }
    };
    shared.stats.record_completion(stored.is_some());
    if let Some(key) = stored {
        // Receiver may be gone; nothing else to do then.
        let _ = shared.events.send(TileAvailable { key });
    }

    state.workers[worker].finish();
    shared.idle.notify_all();
    shared.idle_notify.notify_waiters();

    dispatch(shared, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::{CacheStatus, MemoryTileStore};
    use crate::provider::{FetchError, ImageType, MockFetcher};

    const URL: &str = "http://tiles.test/{z}/{x}/{y}.png";

    fn server(parallelism: usize) -> TileServer {
        TileServer::new("Test", URL, 0, 18, parallelism, ImageType::Png).unwrap()
    }

    fn memory_cache() -> TileCache {
        TileCache::new(Arc::new(MemoryTileStore::new(64 * 1024 * 1024)))
    }

    fn coordinator(
        parallelism: usize,
        fetcher: Arc<MockFetcher>,
    ) -> (
        DownloadCoordinator<MockFetcher>,
        mpsc::UnboundedReceiver<TileAvailable>,
        TileCache,
    ) {
        let cache = memory_cache();
        let (coordinator, rx) = DownloadCoordinator::new(
            &server(parallelism),
            cache.clone(),
            fetcher,
            DownloadConfig::default(),
            Handle::current(),
        );
        (coordinator, rx, cache)
    }

    fn url(request: TileRequest) -> String {
        format!("http://tiles.test/{}/{}/{}.png", request.z, request.x, request.y)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_download_is_cached_and_announced() {
        let fetcher = Arc::new(MockFetcher::with_data(vec![7; 32]));
        let (coordinator, mut rx, cache) = coordinator(2, Arc::clone(&fetcher));
        let request = TileRequest::new(3, 4, 2);

        assert_eq!(coordinator.request(request), RequestOutcome::Queued);

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.key, request.with_session(coordinator.session()));

        let lookup = cache.get(&event.key);
        assert_eq!(lookup.status, CacheStatus::Found);
        assert_eq!(lookup.data, Some(vec![7; 32]));
        assert_eq!(fetcher.calls(), vec![url(request)]);

        // Fresh now, so a repeat request is a no-op
        assert_eq!(coordinator.request(request), RequestOutcome::Cached);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_server_expiry_is_used() {
        let fetcher = Arc::new(MockFetcher::with_response(Ok(FetchedTile::new(
            vec![1],
            Some(unix_now() + 60),
        ))));
        let (coordinator, mut rx, cache) = coordinator(1, fetcher);
        coordinator.request(TileRequest::new(1, 0, 0));

        let event = rx.recv().await.unwrap();
        let lookup = cache.get_at(&event.key, unix_now() + 120);
        assert_eq!(lookup.status, CacheStatus::Expired);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_in_flight_and_queued_requests_are_deduplicated() {
        let fetcher = Arc::new(MockFetcher::gated(vec![1]));
        let (coordinator, _rx, _cache) = coordinator(1, Arc::clone(&fetcher));
        let a = TileRequest::new(5, 1, 1);
        let b = TileRequest::new(5, 2, 1);

        assert_eq!(coordinator.request(a), RequestOutcome::Queued);
        assert!(coordinator.is_in_flight(&a));
        assert_eq!(coordinator.request(a), RequestOutcome::InFlight);

        assert_eq!(coordinator.request(b), RequestOutcome::Queued);
        assert_eq!(coordinator.request(b), RequestOutcome::Promoted);
        assert_eq!(coordinator.pending(), 1);

        let stats = coordinator.stats();
        assert_eq!(stats.requested, 4);
        assert_eq!(stats.deduplicated, 2);
        assert_eq!(stats.dispatched, 1);

        fetcher.release(2);
        coordinator.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_expired_tile_is_refetched() {
        let fetcher = Arc::new(MockFetcher::with_data(vec![2; 4]));
        let (coordinator, mut rx, cache) = coordinator(1, Arc::clone(&fetcher));
        let request = TileRequest::new(4, 3, 3);
        let key = request.with_session(coordinator.session());
        cache.put(&key, unix_now() - 10, vec![1]).unwrap();

        assert_eq!(coordinator.request(request), RequestOutcome::Queued);
        rx.recv().await.unwrap();
        assert_eq!(cache.get(&key).data, Some(vec![2; 4]));
        assert_eq!(cache.status(&key), CacheStatus::Found);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_newest_request_is_dispatched_first() {
        let fetcher = Arc::new(MockFetcher::gated(vec![1]));
        let (coordinator, _rx, _cache) = coordinator(1, Arc::clone(&fetcher));
        let a = TileRequest::new(6, 0, 0);
        let b = TileRequest::new(6, 1, 0);
        let c = TileRequest::new(6, 2, 0);

        coordinator.request(a);
        coordinator.request(b);
        coordinator.request(c);
        assert_eq!(coordinator.in_flight(), vec![a]);

        fetcher.release(1);
        wait_until(|| fetcher.call_count() == 2).await;
        assert_eq!(fetcher.calls()[1], url(c));
        assert!(coordinator.is_queued(&b));

        fetcher.release(2);
        coordinator.wait_idle().await;
        assert_eq!(fetcher.calls()[2], url(b));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_backlog_drops_oldest() {
        let fetcher = Arc::new(MockFetcher::gated(vec![1]));
        let (coordinator, _rx, _cache) = coordinator(1, Arc::clone(&fetcher));

        coordinator.request(TileRequest::new(10, 0, 0));
        for x in 1..=(DEFAULT_BACKLOG as u32 + 1) {
            assert_eq!(
                coordinator.request(TileRequest::new(10, x, 0)),
                RequestOutcome::Queued
            );
        }

        assert_eq!(coordinator.pending(), DEFAULT_BACKLOG);
        assert!(!coordinator.is_queued(&TileRequest::new(10, 1, 0)));
        assert!(coordinator.is_queued(&TileRequest::new(10, 2, 0)));
        assert_eq!(coordinator.stats().evicted, 1);

        fetcher.release(1);
        coordinator.shutdown().await;
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallelism_is_bounded() {
        let fetcher = Arc::new(MockFetcher::gated(vec![1]));
        let (coordinator, _rx, cache) = coordinator(2, Arc::clone(&fetcher));
        let requests: Vec<_> = (0..5).map(|x| TileRequest::new(8, x, 7)).collect();

        for request in &requests {
            coordinator.request(*request);
        }
        wait_until(|| fetcher.in_flight() == 2).await;
        assert_eq!(coordinator.in_flight().len(), 2);
        assert_eq!(coordinator.pending(), 3);

        fetcher.release(5);
        coordinator.wait_idle().await;

        assert_eq!(fetcher.peak_in_flight(), 2);
        assert_eq!(coordinator.stats().peak_in_flight, 2);
        for request in &requests {
            assert!(cache.is_fresh(&request.with_session(coordinator.session())));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_empty_response_is_not_cached() {
        let fetcher = Arc::new(MockFetcher::with_data(Vec::new()));
        let (coordinator, mut rx, cache) = coordinator(1, Arc::clone(&fetcher));
        let request = TileRequest::new(2, 1, 1);

        coordinator.request(request);
        coordinator.wait_idle().await;

        assert_eq!(
            cache.status(&request.with_session(coordinator.session())),
            CacheStatus::NotFound
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(coordinator.stats().failed, 1);

        // Still missing, so it can be asked for again
        assert_eq!(coordinator.request(request), RequestOutcome::Queued);
        coordinator.wait_idle().await;
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fetch_error_frees_worker() {
        let fetcher = Arc::new(MockFetcher::with_response(Err(FetchError::Status {
            status: 503,
            url: "x".to_string(),
        })));
        let (coordinator, _rx, _cache) = coordinator(1, Arc::clone(&fetcher));

        coordinator.request(TileRequest::new(2, 0, 0));
        coordinator.request(TileRequest::new(2, 1, 0));
        coordinator.wait_idle().await;

        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(coordinator.stats().failed, 2);
        assert!(coordinator.in_flight().is_empty());
    }

    struct PanickingFetcher;

    impl TileFetcher for PanickingFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedTile, FetchError> {
            panic!("fetcher bug while loading {url}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_fetcher_frees_worker() {
        let (coordinator, mut rx) = DownloadCoordinator::new(
            &server(1),
            memory_cache(),
            Arc::new(PanickingFetcher),
            DownloadConfig::default(),
            Handle::current(),
        );

        coordinator.request(TileRequest::new(2, 0, 0));
        coordinator.request(TileRequest::new(2, 1, 0));
        tokio::time::timeout(Duration::from_secs(5), coordinator.wait_idle())
            .await
            .expect("worker stuck after panic");

        assert_eq!(coordinator.stats().failed, 2);
        assert!(coordinator.in_flight().is_empty());
        assert!(rx.try_recv().is_err());

        tokio::time::timeout(Duration::from_secs(5), coordinator.shutdown())
            .await
            .expect("shutdown hung after panic");
        assert!(coordinator.is_stopped());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_out_of_range_requests_are_ignored() {
        let fetcher = Arc::new(MockFetcher::with_data(vec![1]));
        let (coordinator, _rx, _cache) = coordinator(1, Arc::clone(&fetcher));

        assert_eq!(
            coordinator.request(TileRequest::new(19, 0, 0)),
            RequestOutcome::OutOfRange
        );
        assert_eq!(
            coordinator.request(TileRequest::new(2, 4, 0)),
            RequestOutcome::OutOfRange
        );
        assert_eq!(coordinator.pending(), 0);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_waits_for_running_fetches() {
        let fetcher = Arc::new(MockFetcher::gated(vec![9; 8]));
        let (coordinator, _rx, cache) = coordinator(2, Arc::clone(&fetcher));
        let coordinator = Arc::new(coordinator);
        let running = [TileRequest::new(7, 0, 0), TileRequest::new(7, 1, 0)];

        for request in running {
            coordinator.request(request);
        }
        coordinator.request(TileRequest::new(7, 2, 0));
        wait_until(|| fetcher.in_flight() == 2).await;

        let stopper = Arc::clone(&coordinator);
        let stop = tokio::task::spawn_blocking(move || stopper.stop());

        wait_until(|| coordinator.is_stopped()).await;
        assert_eq!(coordinator.pending(), 0);
        assert_eq!(
            coordinator.request(TileRequest::new(7, 3, 0)),
            RequestOutcome::Stopped
        );

        fetcher.release(2);
        tokio::time::timeout(Duration::from_secs(5), stop)
            .await
            .unwrap()
            .unwrap();

        assert!(coordinator.in_flight().is_empty());
        for request in running {
            assert!(cache.is_fresh(&request.with_session(coordinator.session())));
        }
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_when_idle_returns_immediately() {
        let fetcher = Arc::new(MockFetcher::with_data(vec![1]));
        let (coordinator, _rx, _cache) = coordinator(1, fetcher);
        coordinator.shutdown().await;
        assert!(coordinator.is_stopped());
    }
}
