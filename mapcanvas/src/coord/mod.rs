//! Tile and viewport coordinates
//!
//! Tiles are addressed as `(z, x, y)` cells of a square tile pyramid.
//! Viewports are rectangles in tile-layer pixel space at one zoom level,
//! so projection from geographic coordinates happens outside this crate.

mod types;

pub use types::{
    tiles_per_axis, PixelRect, TileCell, TileCells, TileKey, TileRequest, Viewport,
    DEFAULT_TILE_SIZE, MAX_ZOOM,
};
