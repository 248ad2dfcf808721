//! Per-frame processing: locate the board, solve its pose, draw the overlay.

use crate::detect::PatternLocator;
use crate::geometry::{solve_pnp, Camera, ChessboardSpec, PnpSolution, PoseError};
use crate::overlay::{render_overlay, ArShape, OverlayStyle};
use image::RgbImage;
use log::debug;
use nalgebra::Point3;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// What happened to a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The pattern was not fully visible; the frame is untouched.
    NoPattern,
    /// Corners were found but no pose could be solved; the frame is untouched.
    PoseFailed(PoseError),
    /// The overlay was drawn with this pose.
    Posed(PnpSolution),
}

/// Board geometry, camera and overlay shape, built once per run.
pub struct PoseEstimator<L> {
    locator: L,
    camera: Camera,
    object_points: Vec<Point3<f64>>,
    shape: ArShape,
    style: OverlayStyle,
}

impl<L: PatternLocator> PoseEstimator<L> {
    pub fn new(locator: L, camera: Camera, board: &ChessboardSpec) -> Self {
        Self {
            locator,
            camera,
            object_points: board.object_points(),
            shape: ArShape::h_prism(board.cell_size),
            style: OverlayStyle::default(),
        }
    }

    /// Annotate `frame` in place when the board is found and posed.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(width = frame.width(), height = frame.height()))
    )]
    pub fn process(&self, frame: &mut RgbImage) -> FrameOutcome {
        let Some(image_points) = self.locator.locate(frame) else {
            return FrameOutcome::NoPattern;
        };

        match solve_pnp(&self.object_points, &image_points, &self.camera) {
            Ok(solution) => {
                render_overlay(frame, &self.camera, &solution.pose, &self.shape, &self.style);
                FrameOutcome::Posed(solution)
            }
            Err(err) => {
                debug!("pose failed: {err}");
                FrameOutcome::PoseFailed(err)
            }
        }
    }
}
