//! High-level facade crate for the `board-pose-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying geometry, detection and overlay crates
//! - end-to-end helpers that find a chessboard with ChESS corners
//!   (`chess-corners`), solve the camera pose and draw an "H" prism on the frame
//! - the interactive frame loop used by the `board-pose` binary
//!
//! ## Quickstart
//!
//! ```no_run
//! use board_pose::config::PoseConfig;
//! use board_pose::pipeline::{FrameOutcome, PoseEstimator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PoseConfig::default();
//! let estimator = PoseEstimator::new(config.locator()?, config.camera()?, &config.board);
//!
//! let mut frame = image::open("frame.png")?.to_rgb8();
//! if let FrameOutcome::Posed(solution) = estimator.process(&mut frame) {
//!     println!("{}", solution.pose.camera_position());
//! }
//! frame.save("frame_annotated.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `board_pose::core`: corners, homographies, orientation clustering, logging.
//! - `board_pose::chessboard`: chessboard localization from ChESS corners.
//! - `board_pose::geometry`: camera model, PnP and the camera position.
//! - `board_pose::overlay`: the AR shape and its rendering.
//! - `board_pose::detect`: ChESS detection on `image::GrayImage` and the
//!   [`PatternLocator`](detect::PatternLocator) seam.
//! - `board_pose::run`: the Running/Paused/Stopped frame loop.
//! - `board_pose::video` (plus `video::opencv` with feature `opencv`): frame
//!   sources, sinks and displays.

pub use board_pose_chessboard as chessboard;
pub use board_pose_core as core;
pub use board_pose_geometry as geometry;
pub use board_pose_overlay as overlay;

pub use board_pose_geometry::{BoardPose, Camera, CameraPosition, ChessboardSpec};

pub mod config;
pub mod detect;
pub mod keys;
pub mod pipeline;
pub mod run;
pub mod video;
