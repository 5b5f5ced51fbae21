//! Tile layer bootstrap.
//!
//! `TileLayer` wires the cache, download coordinator and compositor for one
//! tile server. The session identifier is the server's URL template, so
//! switching servers never mixes their tiles.

use std::sync::Arc;

use image::RgbaImage;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;

use super::config::LayerConfig;
use super::error::AppError;
use crate::cache::{TileCache, TileLookup};
use crate::coord::{TileRequest, Viewport};
use crate::download::{DownloadCoordinator, DownloadSnapshot, TileAvailable};
use crate::provider::{ReqwestFetcher, TileFetcher, TileServer};
use crate::render::{RenderReport, TileSource, ViewportCompositor};

impl<F: TileFetcher> TileSource for DownloadCoordinator<F> {
    fn lookup(&self, tile: TileRequest) -> TileLookup {
        self.cache().get(&tile.with_session(self.session()))
    }

    fn request(&self, tile: TileRequest) {
        DownloadCoordinator::request(self, tile);
    }
}

/// A raster map layer for one tile server.
///
/// # Example
///
/// ```ignore
/// use mapcanvas::app::{LayerConfig, TileLayer};
///
/// let runtime = tokio::runtime::Runtime::new()?;
/// let (mut layer, mut events) = TileLayer::open(config, runtime.handle().clone())?;
///
/// layer.render(viewport);
/// while let Ok(Some(_)) = runtime.block_on(async { events.recv().await }) {
///     layer.render(viewport);
/// }
///
/// layer.stop();
/// ```
pub struct TileLayer<F: TileFetcher = ReqwestFetcher> {
    server: TileServer,
    coordinator: DownloadCoordinator<F>,
    compositor: ViewportCompositor,
}

impl TileLayer<ReqwestFetcher> {
    /// Opens a layer that downloads over HTTP.
    ///
    /// Returns the layer and the receiver of tile-available events.
    ///
    /// # Errors
    ///
    /// Returns `AppError::HttpClient` if the HTTP client cannot be built.
    pub fn open(
        config: LayerConfig,
        runtime: Handle,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TileAvailable>), AppError> {
        let fetcher =
            ReqwestFetcher::with_timeout(config.timeout_secs).map_err(AppError::HttpClient)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), runtime))
    }
}

impl<F: TileFetcher> TileLayer<F> {
    /// Opens a layer with a custom fetcher.
    pub fn with_fetcher(
        config: LayerConfig,
        fetcher: Arc<F>,
        runtime: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<TileAvailable>) {
        let cache = TileCache::new(config.open_store());
        let (coordinator, events) =
            DownloadCoordinator::new(&config.server, cache, fetcher, config.download, runtime);
        let compositor = ViewportCompositor::new(
            config.tile_size,
            config.server.zoom_range(),
            config.server.image_type(),
        );

        info!(
            layer = config.server.name(),
            url = %config.server.url(),
            zoom_min = config.server.min_zoom(),
            zoom_max = config.server.max_zoom(),
            parallel = config.server.parallelism(),
            "Tile layer opened"
        );

        let layer = Self {
            server: config.server,
            coordinator,
            compositor,
        };
        (layer, events)
    }

    /// Renders a viewport from cached tiles, requesting missing ones.
    ///
    /// The pixels are available from [`image`](Self::image).
    pub fn render(&mut self, viewport: Viewport) -> RenderReport {
        self.compositor.render(viewport, &self.coordinator)
    }

    /// Pixels of the most recent render.
    pub fn image(&self) -> &RgbaImage {
        self.compositor.image()
    }

    /// Report of the most recent render.
    pub fn last_render(&self) -> Option<RenderReport> {
        self.compositor.last_report()
    }

    pub fn stats(&self) -> DownloadSnapshot {
        self.coordinator.stats()
    }

    /// Pending download requests.
    pub fn pending(&self) -> usize {
        self.coordinator.pending()
    }

    /// Stops downloads, blocking until running fetches finish.
    ///
    /// Must not be called from a thread driving the layer's runtime.
    pub fn stop(&self) {
        self.coordinator.stop();
    }

    /// Async form of [`stop`](Self::stop).
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }

    /// Waits until no download is pending or running.
    pub async fn wait_idle(&self) {
        self.coordinator.wait_idle().await;
    }

    pub fn name(&self) -> &str {
        self.server.name()
    }

    pub fn server(&self) -> &TileServer {
        &self.server
    }

    /// Cache session of this layer.
    pub fn session(&self) -> &Arc<str> {
        self.coordinator.session()
    }

    pub fn cache(&self) -> &TileCache {
        self.coordinator.cache()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    use image::{ImageFormat, Rgba};

    use crate::provider::{ImageType, MockFetcher};
    use crate::render::{RenderMode, PLACEHOLDER_COLOR};

    fn png_tile(size: u32, color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(size, size, Rgba(color));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn layer_config() -> LayerConfig {
        let server =
            TileServer::new("Test", "http://tiles.test/{z}/{x}/{y}.png", 0, 18, 2, ImageType::Png)
                .unwrap();
        LayerConfig::in_memory(server).with_tile_size(64)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_render_fetch_rerender() {
        let fetcher = Arc::new(MockFetcher::with_data(png_tile(64, [10, 20, 30, 255])));
        let (mut layer, mut events) =
            TileLayer::with_fetcher(layer_config(), Arc::clone(&fetcher), Handle::current());
        let viewport = Viewport::new(0, 0, 1, 128, 128);

        let first = layer.render(viewport);
        assert!(first.dirty);
        assert_eq!(first.requested, 4);
        assert_eq!(*layer.image().get_pixel(0, 0), PLACEHOLDER_COLOR);

        for _ in 0..4 {
            tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .unwrap()
                .unwrap();
        }

        let second = layer.render(viewport);
        assert_eq!(second.mode, RenderMode::Full);
        assert!(!second.dirty);
        assert_eq!(second.tiles_drawn, 4);
        assert_eq!(*layer.image().get_pixel(100, 100), Rgba([10, 20, 30, 255]));
        assert_eq!(layer.last_render(), Some(second));

        assert_eq!(layer.render(viewport).mode, RenderMode::Unchanged);
        assert_eq!(fetcher.call_count(), 4);
        assert_eq!(layer.stats().completed, 4);

        layer.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_render_is_served_from_session_cache() {
        let fetcher = Arc::new(MockFetcher::with_data(Vec::new()));
        let (mut layer, _events) =
            TileLayer::with_fetcher(layer_config(), Arc::clone(&fetcher), Handle::current());

        let key = TileRequest::new(0, 0, 0).with_session(layer.session());
        layer
            .cache()
            .put(&key, crate::time::unix_now() + 3_600, png_tile(64, [1, 2, 3, 255]))
            .unwrap();

        let report = layer.render(Viewport::new(0, 0, 0, 64, 64));
        assert!(!report.dirty);
        assert_eq!(report.requested, 0);
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(layer.name(), "Test");
        assert_eq!(&**layer.session(), "http://tiles.test/{z}/{x}/{y}.png");
    }
}
