//! Coordinate type definitions

use std::fmt;
use std::sync::Arc;

/// Default edge length of a square tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Highest zoom level addressable with 32-bit tile indices.
pub const MAX_ZOOM: u8 = 30;

/// Returns the number of tiles along one axis of the pyramid at `zoom`.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << zoom.min(MAX_ZOOM)
}

/// A tile cell request, without session.
///
/// The session is implied by the coordinator that owns the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRequest {
    /// Zoom level
    pub z: u8,
    /// X coordinate (east-west), 0 at west
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
}

impl TileRequest {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Attaches a session to produce a full cache key.
    pub fn with_session(&self, session: &Arc<str>) -> TileKey {
        TileKey {
            session: Arc::clone(session),
            z: self.z,
            x: self.x,
            y: self.y,
        }
    }
}

impl fmt::Display for TileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Unique identity of a tile within one tile-server session.
///
/// Sessions namespace the cache so that switching tile servers never
/// collides with tiles cached from a previous server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Cache namespace of the tile server configuration
    pub session: Arc<str>,
    /// Zoom level
    pub z: u8,
    /// X coordinate (east-west), 0 at west
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
}

impl TileKey {
    pub fn new(session: impl Into<Arc<str>>, z: u8, x: u32, y: u32) -> Self {
        Self {
            session: session.into(),
            z,
            x,
            y,
        }
    }

    /// Drops the session, keeping only the cell coordinates.
    pub fn request(&self) -> TileRequest {
        TileRequest::new(self.z, self.x, self.y)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}/{}", self.session, self.z, self.x, self.y)
    }
}

/// Rectangle in a pixel buffer's own coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn right(&self) -> i64 {
        self.x + i64::from(self.w)
    }

    #[inline]
    pub fn bottom(&self) -> i64 {
        self.y + i64::from(self.h)
    }
}

/// A rectangular region of the tile layer at a given zoom level.
///
/// The origin is expressed in tile-layer pixel space at zoom `z`, so
/// `x / tile_size` is the column of the tile under the left edge. Two
/// viewports are equal only if all five fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    /// Left edge in layer pixels
    pub x: u64,
    /// Top edge in layer pixels
    pub y: u64,
    /// Zoom level
    pub z: u8,
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

impl Viewport {
    pub fn new(x: u64, y: u64, z: u8, w: u32, h: u32) -> Self {
        Self { x, y, z, w, h }
    }

    /// Returns true if the viewport covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Exclusive right edge in layer pixels.
    #[inline]
    pub fn right(&self) -> u64 {
        self.x + u64::from(self.w)
    }

    /// Exclusive bottom edge in layer pixels.
    #[inline]
    pub fn bottom(&self) -> u64 {
        self.y + u64::from(self.h)
    }

    /// Returns the overlapping region of two viewports.
    ///
    /// Viewports at different zoom levels never overlap. Returns `None` when
    /// the overlap covers no pixels.
    pub fn intersect(&self, other: &Viewport) -> Option<Viewport> {
        if self.z != other.z {
            return None;
        }

        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return None;
        }

        Some(Viewport {
            x: left,
            y: top,
            z: self.z,
            w: (right - left) as u32,
            h: (bottom - top) as u32,
        })
    }

    /// Returns the parts of `self` not covered by `covered`.
    ///
    /// `covered` must lie inside `self` (it is normally the intersection of
    /// `self` with a previous viewport). Bands are yielded left, right, top,
    /// bottom; the left and right bands span the full height while the top
    /// and bottom bands span only the width of `covered`.
    pub fn exposed_bands(&self, covered: &Viewport) -> Vec<Viewport> {
        let mut bands = Vec::with_capacity(4);

        if covered.x > self.x {
            bands.push(Viewport::new(
                self.x,
                self.y,
                self.z,
                (covered.x - self.x) as u32,
                self.h,
            ));
        }
        if covered.right() < self.right() {
            bands.push(Viewport::new(
                covered.right(),
                self.y,
                self.z,
                (self.right() - covered.right()) as u32,
                self.h,
            ));
        }
        if covered.y > self.y {
            bands.push(Viewport::new(
                covered.x,
                self.y,
                self.z,
                covered.w,
                (covered.y - self.y) as u32,
            ));
        }
        if covered.bottom() < self.bottom() {
            bands.push(Viewport::new(
                covered.x,
                covered.bottom(),
                self.z,
                covered.w,
                (self.bottom() - covered.bottom()) as u32,
            ));
        }

        bands
    }

    /// Translates a sub-region of this viewport into buffer coordinates.
    ///
    /// The returned rectangle is relative to this viewport's origin.
    pub fn local_rect(&self, region: &Viewport) -> PixelRect {
        PixelRect::new(
            region.x as i64 - self.x as i64,
            region.y as i64 - self.y as i64,
            region.w,
            region.h,
        )
    }

    /// Returns an iterator over the tile cells covering this viewport.
    ///
    /// Cells are yielded in row-major order together with their draw offset
    /// relative to the viewport origin.
    #[inline]
    pub fn tiles(&self, tile_size: u32) -> TileCells {
        let size = u64::from(tile_size.max(1));
        TileCells {
            first_x: self.x / size,
            first_y: self.y / size,
            offset_x: -((self.x % size) as i64),
            offset_y: -((self.y % size) as i64),
            width: i64::from(self.w),
            height: i64::from(self.h),
            size: size as i64,
            col: 0,
            row: 0,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z{} ({}, {}) {}x{}",
            self.z, self.x, self.y, self.w, self.h
        )
    }
}

/// A tile cell intersecting a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCell {
    /// Tile column in the pyramid
    pub tile_x: u64,
    /// Tile row in the pyramid
    pub tile_y: u64,
    /// Left edge of the tile relative to the viewport origin
    pub offset_x: i64,
    /// Top edge of the tile relative to the viewport origin
    pub offset_y: i64,
}

/// Iterator over tile cells covering a viewport.
///
/// Tile index is `floor(pixel / tile_size)` and the first cell is drawn at
/// `-(pixel mod tile_size)` so partial edge tiles align.
#[derive(Debug, Clone)]
pub struct TileCells {
    first_x: u64,
    first_y: u64,
    offset_x: i64,
    offset_y: i64,
    width: i64,
    height: i64,
    size: i64,
    col: u64,
    row: u64,
}

impl Iterator for TileCells {
    type Item = TileCell;

    fn next(&mut self) -> Option<Self::Item> {
        if self.width <= 0 {
            return None;
        }

        let py = self.offset_y + self.row as i64 * self.size;
        if py >= self.height {
            return None;
        }

        let px = self.offset_x + self.col as i64 * self.size;
        let cell = TileCell {
            tile_x: self.first_x + self.col,
            tile_y: self.first_y + self.row,
            offset_x: px,
            offset_y: py,
        };

        // Advance in row-major order
        if px + self.size >= self.width {
            self.col = 0;
            self.row += 1;
        } else {
            self.col += 1;
        }

        Some(cell)
    }
}
