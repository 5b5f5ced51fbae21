//! Viewport rendering.
//!
//! [`ViewportCompositor`] turns a [`Viewport`](crate::coord::Viewport) into
//! an RGBA image from whatever a [`TileSource`] has cached, asking the source
//! to fetch anything stale or missing.

mod canvas;
mod compositor;

pub use canvas::{blit_clipped, fill_clipped, intersect_rects, OUT_OF_RANGE_COLOR, PLACEHOLDER_COLOR};
pub use compositor::{RenderMode, RenderReport, TileSource, ViewportCompositor};
