//! JSON configuration for the pose-estimation run.
//!
//! [`PoseConfig::default`] reproduces the calibration, board and output
//! settings of the reference capture setup; every field can be overridden
//! from a JSON file or the command line.

use crate::chessboard::{ChessboardDetector, ChessboardParams, GridGraphParams};
use crate::detect::{default_chess_config, ChessboardLocator, DetectError};
use crate::geometry::{Camera, ChessboardSpec, PoseError};
use chess_corners::ChessConfig;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid camera: {0}")]
    Camera(#[from] PoseError),
    #[error(transparent)]
    Pattern(#[from] DetectError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// OpenCV-style camera matrix and `[k1, k2, p1, p2, k3]` distortion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub k: [[f64; 3]; 3],
    pub dist: [f64; 5],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            k: [
                [1.63243490e+03, 0.0, 7.29840790e+02],
                [0.0, 1.63197867e+03, 5.41535124e+02],
                [0.0, 0.0, 1.0],
            ],
            dist: [
                2.74755274e-01,
                -1.23648857e+00,
                6.93900545e-04,
                2.07391502e-03,
                1.84649263e+00,
            ],
        }
    }
}

impl CameraConfig {
    pub fn build(&self) -> Result<Camera, PoseError> {
        Camera::from_k_dist(&self.k, self.dist)
    }
}

/// Partial overrides applied on top of [`default_chess_config`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessOverrides {
    pub threshold_rel: Option<f32>,
    pub nms_radius: Option<u32>,
}

impl ChessOverrides {
    pub fn apply(&self, cfg: &mut ChessConfig) {
        if let Some(t) = self.threshold_rel {
            cfg.params.threshold_rel = t;
        }
        if let Some(r) = self.nms_radius {
            cfg.params.nms_radius = r;
        }
    }
}

fn default_input() -> String {
    "test_video.mov".to_owned()
}

fn default_output() -> String {
    "pose_estimation_h.mp4".to_owned()
}

fn default_fps() -> f64 {
    20.0
}

fn default_frame_delay_ms() -> u64 {
    10
}

fn default_window_title() -> String {
    "Pose Estimation (Chessboard)".to_owned()
}

/// Everything a run needs, fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseConfig {
    /// Video file (OpenCV backend) or directory of frames.
    #[serde(default = "default_input")]
    pub input: String,
    /// Output video file; without a video backend the frames are written as
    /// a PNG sequence into the directory named by the file stem.
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub board: ChessboardSpec,
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Minimal time between two frames.
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
    #[serde(default = "default_window_title")]
    pub window_title: String,
    #[serde(default)]
    pub chessboard: Option<ChessboardParams>,
    #[serde(default)]
    pub graph: Option<GridGraphParams>,
    #[serde(default)]
    pub chess: Option<ChessOverrides>,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            camera: CameraConfig::default(),
            board: ChessboardSpec::default(),
            fps: default_fps(),
            frame_delay_ms: default_frame_delay_ms(),
            window_title: default_window_title(),
            chessboard: None,
            graph: None,
            chess: None,
        }
    }
}

impl PoseConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the values that cannot be caught by deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board.cols < 2 || self.board.rows < 2 {
            return Err(DetectError::InvalidPattern {
                cols: self.board.cols,
                rows: self.board.rows,
            }
            .into());
        }
        if !(self.board.cell_size.is_finite() && self.board.cell_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "board.cell_size must be positive (got {})",
                self.board.cell_size
            )));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fps must be positive (got {})",
                self.fps
            )));
        }
        self.camera.build()?;
        Ok(())
    }

    pub fn camera(&self) -> Result<Camera, ConfigError> {
        Ok(self.camera.build()?)
    }

    pub fn chess_config(&self) -> ChessConfig {
        let mut cfg = default_chess_config();
        if let Some(overrides) = &self.chess {
            overrides.apply(&mut cfg);
        }
        cfg
    }

    pub fn detector(&self) -> ChessboardDetector {
        let params = self.chessboard.clone().unwrap_or_default();
        let detector = ChessboardDetector::new(self.board.cols, self.board.rows, params);
        match &self.graph {
            Some(graph) => detector.with_grid_search(graph.clone()),
            None => detector,
        }
    }

    pub fn locator(&self) -> Result<ChessboardLocator, ConfigError> {
        Ok(ChessboardLocator::new(self.chess_config(), self.detector())?)
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    /// Directory used when frames are written as a PNG sequence.
    pub fn png_output_dir(&self) -> PathBuf {
        let path = Path::new(&self.output);
        match path.extension() {
            Some(_) => path.with_extension(""),
            None => path.to_path_buf(),
        }
    }
}
