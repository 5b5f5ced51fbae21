//! Incremental viewport compositor.
//!
//! Assembles the pixels of a viewport from cached tiles, reusing the pixels
//! of the previous render wherever the two viewports overlap.
//!
//! # Redraw strategy
//!
//! ```text
//!   previous P            requested V             exposed bands of V
//!  ┌──────────┐          ┌──────────┐           ┌──┬───────┐
//!  │      ┌───┼──────┐   │  I = P∩V │           │  │  top  │
//!  │      │ I │      │   └──────────┘           │L ├───────┤
//!  └──────┼───┘      │                          │  │   I   │  (copied)
//!         └──────────┘                          └──┴───────┘
//! ```
//!
//! - Out-of-range zoom: flat fill, previous viewport forgotten.
//! - Same viewport, clean previous render: nothing to do.
//! - No overlap, or previous render dirty: full redraw.
//! - Otherwise: copy the overlap `I` from the current buffer into scratch,
//!   redraw only the bands of `V` outside `I`, then swap.
//!
//! A render is dirty when any tile it drew was not FOUND in the cache, which
//! means a better image will exist once downloads land.

use std::mem;
use std::ops::RangeInclusive;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use tracing::{trace, warn};

use crate::cache::{CacheStatus, TileLookup};
use crate::coord::{tiles_per_axis, PixelRect, TileRequest, Viewport, DEFAULT_TILE_SIZE};
use crate::provider::{ImageType, TileServer};
use crate::render::canvas::{
    blit_clipped, fill_clipped, OUT_OF_RANGE_COLOR, PLACEHOLDER_COLOR,
};

/// Where the compositor gets tiles from and reports missing ones to.
pub trait TileSource {
    /// Looks a tile up in the cache.
    fn lookup(&self, tile: TileRequest) -> TileLookup;

    /// Asks for a missing or stale tile to be downloaded.
    fn request(&self, tile: TileRequest);
}

/// How a render pass produced its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Previous image returned as is.
    Unchanged,
    /// Every tile cell redrawn.
    Full,
    /// Overlap copied, exposed bands redrawn.
    Incremental,
    /// Zoom outside the server's range; flat fill.
    OutOfRange,
}

/// Summary of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub viewport: Viewport,
    pub mode: RenderMode,
    /// Some drawn tile was stale, missing or undecodable.
    pub dirty: bool,
    /// Tiles drawn from cached bytes.
    pub tiles_drawn: usize,
    /// Cells filled with the placeholder color.
    pub placeholders: usize,
    /// Download requests issued.
    pub requested: usize,
}

impl RenderReport {
    fn new(viewport: Viewport, mode: RenderMode) -> Self {
        Self {
            viewport,
            mode,
            dirty: false,
            tiles_drawn: 0,
            placeholders: 0,
            requested: 0,
        }
    }
}

/// Double-buffered compositor for one tile layer.
pub struct ViewportCompositor {
    tile_size: u32,
    zoom_range: RangeInclusive<u8>,
    format: ImageFormat,
    current: RgbaImage,
    scratch: RgbaImage,
    previous: Option<Viewport>,
    dirty: bool,
    last: Option<RenderReport>,
}

impl ViewportCompositor {
    /// Creates a compositor.
    ///
    /// # Arguments
    ///
    /// * `tile_size` - Edge length of a tile in pixels
    /// * `zoom_range` - Zoom levels that have tiles
    /// * `image_type` - Encoding of cached tile bytes
    pub fn new(tile_size: u32, zoom_range: RangeInclusive<u8>, image_type: ImageType) -> Self {
        Self {
            tile_size: tile_size.max(1),
            zoom_range,
            format: image_type.format(),
            current: RgbaImage::new(0, 0),
            scratch: RgbaImage::new(0, 0),
            previous: None,
            dirty: false,
            last: None,
        }
    }

    /// Compositor matching a tile server's zoom range and encoding.
    pub fn for_server(server: &TileServer) -> Self {
        Self::new(DEFAULT_TILE_SIZE, server.zoom_range(), server.image_type())
    }

    /// Renders `viewport`, requesting any tile that is not FOUND.
    ///
    /// The returned image is sized exactly to the viewport and is available
    /// through [`image`](Self::image) until the next render.
    pub fn render<S: TileSource + ?Sized>(
        &mut self,
        viewport: Viewport,
        source: &S,
    ) -> RenderReport {
        let report = self.compose(viewport, source);
        trace!(
            viewport = %viewport,
            mode = ?report.mode,
            dirty = report.dirty,
            drawn = report.tiles_drawn,
            placeholders = report.placeholders,
            requested = report.requested,
            "Render pass"
        );
        self.last = Some(report);
        report
    }

    fn compose<S: TileSource + ?Sized>(&mut self, viewport: Viewport, source: &S) -> RenderReport {
        if !self.zoom_range.contains(&viewport.z) {
            self.current = RgbaImage::from_pixel(viewport.w, viewport.h, OUT_OF_RANGE_COLOR);
            self.previous = None;
            self.dirty = false;
            return RenderReport::new(viewport, RenderMode::OutOfRange);
        }

        if self.previous == Some(viewport) && !self.dirty {
            return RenderReport::new(viewport, RenderMode::Unchanged);
        }

        if self.scratch.dimensions() != (viewport.w, viewport.h) {
            self.scratch = RgbaImage::new(viewport.w, viewport.h);
        }

        let overlap = match self.previous {
            Some(previous) if !self.dirty => previous.intersect(&viewport),
            _ => None,
        };

        let report = match (overlap, self.previous) {
            (Some(overlap), Some(previous)) => {
                let mut report = RenderReport::new(viewport, RenderMode::Incremental);
                let dx = previous.x as i64 - viewport.x as i64;
                let dy = previous.y as i64 - viewport.y as i64;
                blit_clipped(
                    &mut self.scratch,
                    &self.current,
                    dx,
                    dy,
                    viewport.local_rect(&overlap),
                );
                for band in viewport.exposed_bands(&overlap) {
                    self.draw_region(viewport, band, source, &mut report);
                }
                report
            }
            _ => {
                let mut report = RenderReport::new(viewport, RenderMode::Full);
                self.draw_region(viewport, viewport, source, &mut report);
                report
            }
        };

        mem::swap(&mut self.current, &mut self.scratch);
        self.previous = Some(viewport);
        self.dirty = report.dirty;
        report
    }

    /// Draws every tile cell covering `region` into the scratch buffer.
    fn draw_region<S: TileSource + ?Sized>(
        &mut self,
        viewport: Viewport,
        region: Viewport,
        source: &S,
        report: &mut RenderReport,
    ) {
        if region.is_empty() {
            return;
        }

        let clip = viewport.local_rect(&region);
        let grid = tiles_per_axis(viewport.z);

        for cell in region.tiles(self.tile_size) {
            let cell_rect = PixelRect::new(
                clip.x + cell.offset_x,
                clip.y + cell.offset_y,
                self.tile_size,
                self.tile_size,
            );

            if cell.tile_x >= grid || cell.tile_y >= grid {
                fill_clipped(&mut self.scratch, cell_rect, clip, PLACEHOLDER_COLOR);
                report.placeholders += 1;
                continue;
            }

            let tile = TileRequest::new(viewport.z, cell.tile_x as u32, cell.tile_y as u32);
            let lookup = source.lookup(tile);
            if lookup.status != CacheStatus::Found {
                source.request(tile);
                report.requested += 1;
                report.dirty = true;
            }

            match lookup.data.as_deref().and_then(|data| self.decode(tile, data)) {
                Some(image) => {
                    blit_clipped(&mut self.scratch, &image, cell_rect.x, cell_rect.y, clip);
                    report.tiles_drawn += 1;
                }
                None => {
                    fill_clipped(&mut self.scratch, cell_rect, clip, PLACEHOLDER_COLOR);
                    report.placeholders += 1;
                    report.dirty = true;
                }
            }
        }
    }

    fn decode(&self, tile: TileRequest, data: &[u8]) -> Option<RgbaImage> {
        let image = match image::load_from_memory_with_format(data, self.format) {
            Ok(image) => image.to_rgba8(),
            Err(e) => {
                warn!(error = %e, tile = %tile, "Failed to decode cached tile");
                return None;
            }
        };

        if image.dimensions() == (self.tile_size, self.tile_size) {
            Some(image)
        } else {
            Some(imageops::resize(
                &image,
                self.tile_size,
                self.tile_size,
                FilterType::Triangle,
            ))
        }
    }

    /// Pixels of the most recent render.
    pub fn image(&self) -> &RgbaImage {
        &self.current
    }

    /// Viewport of the most recent in-range render.
    pub fn previous(&self) -> Option<Viewport> {
        self.previous
    }

    /// Whether the most recent render used anything but fresh tiles.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_report(&self) -> Option<RenderReport> {
        self.last
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Forces the next render to redraw everything.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }
}

impl std::fmt::Debug for ViewportCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportCompositor")
            .field("tile_size", &self.tile_size)
            .field("zoom_range", &self.zoom_range)
            .field("previous", &self.previous)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}
