//! Axis-angle rotations, board poses and the camera position derived from them.

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rotation matrix from an axis-angle vector (direction = axis, norm = angle).
pub fn rodrigues(rvec: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(*rvec).into_inner()
}

/// Axis-angle vector of a rotation matrix, angle in `[0, π]`.
///
/// The input is re-orthonormalized first, so slightly drifted matrices are
/// accepted.
pub fn rotation_to_rvec(r: &Matrix3<f64>) -> Vector3<f64> {
    let guess = Rotation3::from_matrix_unchecked(*r);
    Rotation3::from_matrix_eps(r, 1e-12, 100, guess).scaled_axis()
}

/// Board-to-camera transform: `X_cam = R(rvec) * X_board + tvec`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardPose {
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl BoardPose {
    pub fn new(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self { rvec, tvec }
    }

    /// Pose from a rotation matrix, stored as its axis-angle vector.
    pub fn from_rotation(r: &Matrix3<f64>, tvec: Vector3<f64>) -> Self {
        Self::new(rotation_to_rvec(r), tvec)
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rodrigues(&self.rvec)
    }

    /// Camera center expressed in board coordinates, `-Rᵀ t`.
    pub fn camera_position(&self) -> CameraPosition {
        CameraPosition(-(self.rotation_matrix().transpose() * self.tvec))
    }
}

/// Camera center in board coordinates (board units).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition(pub Vector3<f64>);

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XYZ: [{:.3} {:.3} {:.3}]", self.0.x, self.0.y, self.0.z)
    }
}
