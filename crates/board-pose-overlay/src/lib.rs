//! Augmented-reality overlay for a posed chessboard.
//!
//! Projects an [`ArShape`] (two stacked rings) with the current pose and
//! draws it on a [`Canvas`] together with the camera position text. The
//! canvas is implemented for `image::RgbImage`.

mod canvas;
mod font;
mod render;
mod shape;

pub use canvas::{Canvas, PixelPoint};
pub use render::{draw_polyline, render_overlay, OverlayStyle};
pub use shape::{ArShape, H_OUTLINE_CELLS};
