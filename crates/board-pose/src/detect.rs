use crate::{chessboard, core};
use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor};
use image::{GrayImage, RgbImage};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced while setting up pattern detection.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error("chessboard pattern needs at least 2x2 inner corners (got {cols}x{rows})")]
    InvalidPattern { cols: usize, rows: usize },
}

/// Reasonable default settings for the `chess-corners` ChESS detector.
///
/// Callers with difficult footage can override the threshold and NMS radius
/// through [`ChessOverrides`](crate::config::ChessOverrides).
pub fn default_chess_config() -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.params.threshold_rel = 0.2;
    cfg.params.nms_radius = 2;
    cfg
}

/// Detect raw ChESS corners using `chess-corners`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, cfg), fields(width = img.width(), height = img.height()))
)]
pub fn detect_chess_corners_raw(img: &GrayImage, cfg: &ChessConfig) -> Vec<CornerDescriptor> {
    find_chess_corners_image(img, cfg)
}

/// Detect ChESS corners and adapt them into [`core::Corner`].
pub fn detect_corners(img: &GrayImage, cfg: &ChessConfig) -> Vec<core::Corner> {
    detect_chess_corners_raw(img, cfg)
        .iter()
        .map(adapt_chess_corner)
        .collect()
}

fn adapt_chess_corner(c: &CornerDescriptor) -> core::Corner {
    core::Corner {
        position: Point2::new(c.x, c.y),
        orientation: c.orientation,
        orientation_cluster: None,
        strength: c.response,
    }
}

/// Locates the inner corners of a calibration pattern in a color frame.
///
/// On success the points are in board order, one per reference point, so they
/// can be paired positionally with the board's object points.
pub trait PatternLocator {
    fn locate(&self, frame: &RgbImage) -> Option<Vec<Point2<f64>>>;
}

impl<L: PatternLocator + ?Sized> PatternLocator for &L {
    fn locate(&self, frame: &RgbImage) -> Option<Vec<Point2<f64>>> {
        (**self).locate(frame)
    }
}

/// ChESS corners followed by chessboard grid localization.
pub struct ChessboardLocator {
    chess_cfg: ChessConfig,
    detector: chessboard::ChessboardDetector,
}

impl ChessboardLocator {
    pub fn new(
        chess_cfg: ChessConfig,
        detector: chessboard::ChessboardDetector,
    ) -> Result<Self, DetectError> {
        if detector.cols < 2 || detector.rows < 2 {
            return Err(DetectError::InvalidPattern {
                cols: detector.cols,
                rows: detector.rows,
            });
        }
        Ok(Self {
            chess_cfg,
            detector,
        })
    }

    /// Default ChESS and localizer settings for a `cols x rows` pattern.
    pub fn with_pattern(cols: usize, rows: usize) -> Result<Self, DetectError> {
        Self::new(
            default_chess_config(),
            chessboard::ChessboardDetector::new(cols, rows, chessboard::ChessboardParams::default()),
        )
    }

    /// Run the chessboard detector end-to-end on a grayscale image.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, img),
            fields(width = img.width(), height = img.height())
        )
    )]
    pub fn detect(&self, img: &GrayImage) -> Option<chessboard::ChessboardDetection> {
        let corners = detect_corners(img, &self.chess_cfg);
        self.detector.detect_from_corners(&corners)
    }
}

impl PatternLocator for ChessboardLocator {
    fn locate(&self, frame: &RgbImage) -> Option<Vec<Point2<f64>>> {
        let gray = image::imageops::grayscale(frame);
        self.detect(&gray).map(|d| d.image_points())
    }
}

/// Locate a `cols x rows` chessboard with default settings.
///
/// `None` when the pattern is not fully visible or the size is invalid.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img), fields(width = img.width(), height = img.height()))
)]
pub fn detect_pattern(img: &GrayImage, cols: usize, rows: usize) -> Option<Vec<Point2<f64>>> {
    let locator = ChessboardLocator::with_pattern(cols, rows).ok()?;
    locator.detect(img).map(|d| d.image_points())
}
