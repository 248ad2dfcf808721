//! Camera model and pose recovery for a planar chessboard.
//!
//! - [`Camera`]: pinhole intrinsics with Brown–Conrady distortion, point
//!   projection and pixel undistortion.
//! - [`rodrigues`] / [`rotation_to_rvec`]: axis-angle <-> rotation matrix.
//! - [`BoardPose`]: board-to-camera transform and the camera position
//!   `-Rᵀ t` it implies.
//! - [`solve_pnp`]: planar PnP, homography initialisation refined with
//!   Levenberg–Marquardt.
//!
//! ```
//! use board_pose_geometry::{solve_pnp, BoardPose, Camera, ChessboardSpec};
//! use nalgebra::Vector3;
//!
//! let camera = Camera::from_k_dist(
//!     &[[800.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]],
//!     [0.0; 5],
//! )
//! .unwrap();
//! let board = ChessboardSpec::default();
//! let truth = BoardPose::new(Vector3::new(0.1, 0.2, 0.0), Vector3::new(-0.1, -0.07, 0.6));
//! let image = camera.project_points(&board.object_points(), &truth);
//!
//! let solution = solve_pnp(&board.object_points(), &image, &camera).unwrap();
//! println!("{}", solution.pose.camera_position());
//! ```

mod board;
mod camera;
mod error;
mod pnp;
mod rotation;

pub use board::ChessboardSpec;
pub use camera::{BrownConrady, Camera, CameraIntrinsics};
pub use error::PoseError;
pub use pnp::{
    pose_from_normalized_homography, solve_pnp, solve_pnp_with, LmParams, PnpSolution,
    MIN_CORRESPONDENCES,
};
pub use rotation::{rodrigues, rotation_to_rvec, BoardPose, CameraPosition};
