//! Pixel buffer primitives.
//!
//! Both operations clip against a rectangle and the destination bounds, so
//! callers can hand over tiles that hang off the edge of the viewport.

use image::{Rgba, RgbaImage};

use crate::coord::PixelRect;

/// Fill for tiles that are missing or could not be decoded.
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([200, 113, 113, 255]);

/// Fill for zoom levels the tile server does not serve.
pub const OUT_OF_RANGE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

const CHANNELS: usize = 4;

/// Intersects two rectangles, or `None` if they do not overlap.
pub fn intersect_rects(a: PixelRect, b: PixelRect) -> Option<PixelRect> {
    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = a.right().min(b.right());
    let bottom = a.bottom().min(b.bottom());

    if right <= left || bottom <= top {
        return None;
    }
    Some(PixelRect::new(
        left,
        top,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

fn bounds(image: &RgbaImage) -> PixelRect {
    PixelRect::new(0, 0, image.width(), image.height())
}

/// Fills `rect ∩ clip` with `color`.
pub fn fill_clipped(dst: &mut RgbaImage, rect: PixelRect, clip: PixelRect, color: Rgba<u8>) {
    let Some(area) = intersect_rects(rect, clip).and_then(|r| intersect_rects(r, bounds(dst)))
    else {
        return;
    };

    let stride = dst.width() as usize * CHANNELS;
    let raw: &mut [u8] = dst;
    for y in area.y..area.bottom() {
        let start = y as usize * stride + area.x as usize * CHANNELS;
        let end = start + area.w as usize * CHANNELS;
        for pixel in raw[start..end].chunks_exact_mut(CHANNELS) {
            pixel.copy_from_slice(&color.0);
        }
    }
}

/// Copies `src` into `dst` with its origin at `(dx, dy)`, restricted to `clip`.
///
/// Pixels of `src` landing outside `clip` or outside `dst` are skipped.
pub fn blit_clipped(dst: &mut RgbaImage, src: &RgbaImage, dx: i64, dy: i64, clip: PixelRect) {
    let placed = PixelRect::new(dx, dy, src.width(), src.height());
    let Some(area) = intersect_rects(placed, clip).and_then(|r| intersect_rects(r, bounds(dst)))
    else {
        return;
    };

    let dst_stride = dst.width() as usize * CHANNELS;
    let src_stride = src.width() as usize * CHANNELS;
    let row_bytes = area.w as usize * CHANNELS;
    let src_raw: &[u8] = src;
    let dst_raw: &mut [u8] = dst;

    for y in area.y..area.bottom() {
        let src_start = (y - dy) as usize * src_stride + (area.x - dx) as usize * CHANNELS;
        let dst_start = y as usize * dst_stride + area.x as usize * CHANNELS;
        dst_raw[dst_start..dst_start + row_bytes]
            .copy_from_slice(&src_raw[src_start..src_start + row_bytes]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 7, 255]))
    }

    #[test]
    fn test_intersect_rects() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(5, -3, 10, 5);
        assert_eq!(intersect_rects(a, b), Some(PixelRect::new(5, 0, 5, 2)));
        assert_eq!(intersect_rects(a, PixelRect::new(10, 0, 4, 4)), None);
    }

    #[test]
    fn test_fill_is_clipped() {
        let mut image = RgbaImage::new(8, 8);
        fill_clipped(
            &mut image,
            PixelRect::new(-4, -4, 8, 8),
            PixelRect::new(0, 0, 8, 2),
            PLACEHOLDER_COLOR,
        );

        assert_eq!(*image.get_pixel(0, 0), PLACEHOLDER_COLOR);
        assert_eq!(*image.get_pixel(3, 1), PLACEHOLDER_COLOR);
        assert_eq!(*image.get_pixel(4, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*image.get_pixel(0, 2), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_blit_with_negative_offset() {
        let src = numbered(16, 16);
        let mut dst = RgbaImage::new(8, 8);
        let clip = bounds(&dst);
        blit_clipped(&mut dst, &src, -5, -3, clip);

        assert_eq!(*dst.get_pixel(0, 0), Rgba([5, 3, 7, 255]));
        assert_eq!(*dst.get_pixel(7, 7), Rgba([12, 10, 7, 255]));
    }

    #[test]
    fn test_blit_respects_clip() {
        let src = numbered(4, 4);
        let mut dst = RgbaImage::new(8, 8);
        blit_clipped(&mut dst, &src, 2, 2, PixelRect::new(3, 0, 2, 8));

        assert_eq!(*dst.get_pixel(2, 2), Rgba([0, 0, 0, 0]));
        assert_eq!(*dst.get_pixel(3, 2), Rgba([1, 0, 7, 255]));
        assert_eq!(*dst.get_pixel(4, 5), Rgba([2, 3, 7, 255]));
        assert_eq!(*dst.get_pixel(5, 2), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_blit_outside_destination_is_noop() {
        let src = numbered(4, 4);
        let mut dst = RgbaImage::new(4, 4);
        blit_clipped(&mut dst, &src, 10, 10, PixelRect::new(0, 0, 100, 100));
        assert!(dst.pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }
}
