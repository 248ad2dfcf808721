//! Pinhole camera with Brown–Conrady lens distortion.

use crate::rotation::BoardPose;
use crate::PoseError;
use nalgebra::{Matrix3, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics `K = [[fx, skew, cx], [0, fy, cy], [0, 0, 1]]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub skew: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
        }
    }

    /// Read intrinsics from a row-major 3x3 camera matrix.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Result<Self, PoseError> {
        if k[1][0] != 0.0 || k[2][0] != 0.0 || k[2][1] != 0.0 || k[2][2] != 1.0 {
            return Err(PoseError::InvalidIntrinsics(
                "expected [[fx, s, cx], [0, fy, cy], [0, 0, 1]]",
            ));
        }
        if k[0][0] == 0.0 || k[1][1] == 0.0 {
            return Err(PoseError::InvalidIntrinsics("zero focal length"));
        }
        Ok(Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
            skew: k[0][1],
        })
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    #[inline]
    pub fn to_pixel(&self, n: Vector2<f64>) -> Point2<f64> {
        Point2::new(
            self.fx * n.x + self.skew * n.y + self.cx,
            self.fy * n.y + self.cy,
        )
    }

    #[inline]
    pub fn to_normalized(&self, p: Point2<f64>) -> Vector2<f64> {
        let y = (p.y - self.cy) / self.fy;
        let x = (p.x - self.cx - self.skew * y) / self.fx;
        Vector2::new(x, y)
    }
}

/// Brown–Conrady distortion in OpenCV order `[k1, k2, p1, p2, k3]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady {
    const UNDISTORT_ITERS: usize = 20;

    pub fn from_coeffs(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    pub fn coeffs(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_identity(&self) -> bool {
        self.coeffs().iter().all(|&c| c == 0.0)
    }

    /// Distort an ideal normalized point.
    pub fn distort(&self, n: Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        Vector2::new(x * radial + dx, y * radial + dy)
    }

    /// Invert [`distort`](Self::distort) by fixed-point iteration.
    pub fn undistort(&self, d: Vector2<f64>) -> Vector2<f64> {
        if self.is_identity() {
            return d;
        }
        let mut n = d;
        for _ in 0..Self::UNDISTORT_ITERS {
            let (x, y) = (n.x, n.y);
            let r2 = x * x + y * y;
            let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
            if radial.abs() < 1e-12 {
                break;
            }
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            n = Vector2::new((d.x - dx) / radial, (d.y - dy) / radial);
        }
        n
    }
}

/// Calibrated camera: intrinsics plus lens distortion. Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub intrinsics: CameraIntrinsics,
    #[serde(default)]
    pub distortion: BrownConrady,
}

impl Camera {
    pub fn new(intrinsics: CameraIntrinsics, distortion: BrownConrady) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Camera from an OpenCV-style camera matrix and 5-element distortion vector.
    pub fn from_k_dist(k: &[[f64; 3]; 3], dist: [f64; 5]) -> Result<Self, PoseError> {
        Ok(Self::new(
            CameraIntrinsics::from_matrix(k)?,
            BrownConrady::from_coeffs(dist),
        ))
    }

    /// Project a point given in camera coordinates.
    #[inline]
    pub fn project_camera_point(&self, pc: &Point3<f64>) -> Point2<f64> {
        let n = Vector2::new(pc.x / pc.z, pc.y / pc.z);
        self.intrinsics.to_pixel(self.distortion.distort(n))
    }

    /// Project board-frame points; output has the same length and order.
    pub fn project_points(&self, points: &[Point3<f64>], pose: &BoardPose) -> Vec<Point2<f64>> {
        let r = pose.rotation_matrix();
        points
            .iter()
            .map(|p| self.project_camera_point(&Point3::from(r * p.coords + pose.tvec)))
            .collect()
    }

    /// Pixel -> undistorted normalized image coordinates.
    pub fn undistort_pixel(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::from(self.distortion.undistort(self.intrinsics.to_normalized(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn lens() -> BrownConrady {
        BrownConrady::from_coeffs([
            2.74755274e-01,
            -1.23648857e+00,
            6.93900545e-04,
            2.07391502e-03,
            1.84649263e+00,
        ])
    }

    #[test]
    fn matrix_round_trips_through_intrinsics() {
        let k = [[1632.4349, 0.0, 729.84079], [0.0, 1631.97867, 541.535124], [0.0, 0.0, 1.0]];
        let intr = CameraIntrinsics::from_matrix(&k).expect("valid");
        let m = intr.matrix();
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(k[r][c], m[(r, c)]);
            }
        }
    }

    #[test]
    fn rejects_malformed_camera_matrix() {
        let k = [[800.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 2.0]];
        assert!(CameraIntrinsics::from_matrix(&k).is_err());
        let k = [[0.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]];
        assert!(CameraIntrinsics::from_matrix(&k).is_err());
    }

    #[test]
    fn undistort_inverts_distort_inside_field_of_view() {
        let d = lens();
        for n in [
            Vector2::new(0.0, 0.0),
            Vector2::new(0.1, -0.05),
            Vector2::new(-0.2, 0.15),
            Vector2::new(0.25, 0.2),
        ] {
            let back = d.undistort(d.distort(n));
            assert_relative_eq!(back.x, n.x, epsilon = 1e-9);
            assert_relative_eq!(back.y, n.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn projection_without_distortion_is_pinhole() {
        let cam = Camera::new(CameraIntrinsics::new(800.0, 820.0, 320.0, 240.0), BrownConrady::default());
        let pose = BoardPose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 2.0));
        let pts = cam.project_points(&[Point3::new(0.1, -0.2, 0.0), Point3::origin()], &pose);
        assert_eq!(2, pts.len());
        assert_relative_eq!(pts[0].x, 320.0 + 800.0 * 0.05, epsilon = 1e-12);
        assert_relative_eq!(pts[0].y, 240.0 - 820.0 * 0.1, epsilon = 1e-12);
        assert_relative_eq!(pts[1].x, 320.0, epsilon = 1e-12);
    }

    #[test]
    fn undistort_pixel_recovers_projected_ray() {
        let cam = Camera::new(CameraIntrinsics::new(1600.0, 1600.0, 730.0, 540.0), lens());
        let pc = Point3::new(0.05, 0.03, 0.5);
        let px = cam.project_camera_point(&pc);
        let n = cam.undistort_pixel(px);
        assert_relative_eq!(n.x, 0.1, epsilon = 1e-9);
        assert_relative_eq!(n.y, 0.06, epsilon = 1e-9);
    }
}
