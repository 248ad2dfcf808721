//! Drawing surface abstraction and its `image::RgbImage` implementation.

use crate::font::{glyph, is_set, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use image::{Rgb, RgbImage};
use nalgebra::Point2;

/// Integer pixel coordinates; may lie outside the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Truncate a projected float point toward zero.
    ///
    /// `None` for non-finite input (a point on the camera plane).
    pub fn from_projected(p: Point2<f64>) -> Option<Self> {
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        Some(Self::new(p.x.trunc() as i32, p.y.trunc() as i32))
    }
}

/// Line and text primitives the overlay is rendered with.
pub trait Canvas {
    fn draw_line(&mut self, p0: PixelPoint, p1: PixelPoint, color: Rgb<u8>, thickness: u32);

    /// Draw `text` with its baseline-left corner at `origin`.
    fn draw_text(&mut self, text: &str, origin: PixelPoint, color: Rgb<u8>, scale: u32);
}

#[inline]
fn set_pixel(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < img.width() as i64 && y < img.height() as i64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Clip segment `p0 -> p1` to `[lo, hi]` on both axes (Liang–Barsky).
fn clip_segment(
    p0: (f64, f64),
    p1: (f64, f64),
    lo: (f64, f64),
    hi: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    for (p, q) in [
        (-dx, p0.0 - lo.0),
        (dx, hi.0 - p0.0),
        (-dy, p0.1 - lo.1),
        (dy, hi.1 - p0.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }

    (t0 <= t1).then(|| {
        (
            (p0.0 + t0 * dx, p0.1 + t0 * dy),
            (p0.0 + t1 * dx, p0.1 + t1 * dy),
        )
    })
}

impl Canvas for RgbImage {
    /// Bresenham with a square brush `thickness` pixels wide.
    fn draw_line(&mut self, p0: PixelPoint, p1: PixelPoint, color: Rgb<u8>, thickness: u32) {
        let thickness = thickness.max(1) as i64;
        let (lo_off, hi_off) = (-(thickness - 1) / 2, thickness / 2);

        // Far-away endpoints are clipped so the walk stays bounded by the image.
        let margin = thickness as f64;
        let Some(((x0, y0), (x1, y1))) = clip_segment(
            (p0.x as f64, p0.y as f64),
            (p1.x as f64, p1.y as f64),
            (-margin, -margin),
            (self.width() as f64 + margin, self.height() as f64 + margin),
        ) else {
            return;
        };
        let (mut x0, mut y0) = (x0.round() as i64, y0.round() as i64);
        let (x1, y1) = (x1.round() as i64, y1.round() as i64);

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            for oy in lo_off..=hi_off {
                for ox in lo_off..=hi_off {
                    set_pixel(self, x0 + ox, y0 + oy, color);
                }
            }

            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x0 += sx;
            }
            if e2 < dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn draw_text(&mut self, text: &str, origin: PixelPoint, color: Rgb<u8>, scale: u32) {
        let scale = scale.max(1) as i64;
        let top = origin.y as i64 - GLYPH_HEIGHT as i64 * scale;

        for (k, c) in text.chars().enumerate() {
            let rows = glyph(c);
            let left = origin.x as i64 + (k as i64) * ADVANCE as i64 * scale;
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if !is_set(&rows, col, row) {
                        continue;
                    }
                    let x = left + col as i64 * scale;
                    let y = top + row as i64 * scale;
                    for oy in 0..scale {
                        for ox in 0..scale {
                            set_pixel(self, x + ox, y + oy, color);
                        }
                    }
                }
            }
        }
    }
}
