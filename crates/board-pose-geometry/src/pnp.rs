//! Planar PnP: homography initialisation followed by Levenberg–Marquardt.
//!
//! 1. Pixels are undistorted into normalized image coordinates.
//! 2. A board-plane -> normalized-image homography is estimated (DLT).
//! 3. The homography is decomposed into `[r1 r2 t]` and projected onto SO(3).
//! 4. The pose is refined by LM on the full distorted pixel reprojection error.

use crate::camera::Camera;
use crate::rotation::BoardPose;
use crate::PoseError;
use board_pose_core::{estimate_homography, Homography};
use log::debug;
use nalgebra::{Matrix3, Matrix6, Point2, Point3, Vector3, Vector6};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters of the LM pose refinement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LmParams {
    /// Maximum number of LM iterations.
    pub max_iters: usize,
    /// Stop when an accepted step lowers the squared error by less than this fraction.
    pub rel_eps: f64,
    /// Initial damping.
    pub lambda_init: f64,
    /// Damping is multiplied by this on a rejected step, divided on an accepted one.
    pub lambda_mul: f64,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            max_iters: 30,
            rel_eps: 1e-10,
            lambda_init: 1e-3,
            lambda_mul: 10.0,
        }
    }
}

/// A solved pose and how well it explains the observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnpSolution {
    pub pose: BoardPose,
    /// Root mean square reprojection error, in pixels per coordinate.
    pub rmse: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimal number of correspondences for a planar target.
pub const MIN_CORRESPONDENCES: usize = 4;

/// Solve the board pose from positionally paired board and pixel points.
pub fn solve_pnp(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &Camera,
) -> Result<PnpSolution, PoseError> {
    solve_pnp_with(object, image, camera, &LmParams::default())
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(points = object.len()))
)]
pub fn solve_pnp_with(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &Camera,
    params: &LmParams,
) -> Result<PnpSolution, PoseError> {
    if object.len() != image.len() {
        return Err(PoseError::MismatchedLengths {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < MIN_CORRESPONDENCES {
        return Err(PoseError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: object.len(),
        });
    }

    let extent = object
        .iter()
        .map(|p| p.x.abs().max(p.y.abs()))
        .fold(0.0f64, f64::max)
        .max(1.0);
    if object.iter().any(|p| p.z.abs() > 1e-9 * extent) {
        return Err(PoseError::NonPlanarObjectPoints);
    }

    let board: Vec<Point2<f64>> = object.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let normalized: Vec<Point2<f64>> = image.iter().map(|&p| camera.undistort_pixel(p)).collect();
    let h = estimate_homography(&board, &normalized).ok_or(PoseError::DegenerateHomography)?;
    let initial = pose_from_normalized_homography(&h)?;

    let solution = refine_pose_lm(object, image, camera, initial, params);
    debug!(
        "pnp: {} points, rmse {:.4}px after {} iterations (converged: {})",
        object.len(),
        solution.rmse,
        solution.iterations,
        solution.converged
    );
    Ok(solution)
}

/// Decompose `H ~ [r1 r2 t]` (board plane -> normalized image) into a pose.
pub fn pose_from_normalized_homography(h: &Homography) -> Result<BoardPose, PoseError> {
    let h1 = h.h.column(0).into_owned();
    let h2 = h.h.column(1).into_owned();
    let h3 = h.h.column(2).into_owned();

    let denom = 0.5 * (h1.norm() + h2.norm());
    if h1.norm() <= 1e-12 || h2.norm() <= 1e-12 || denom <= 1e-12 {
        return Err(PoseError::DegenerateHomography);
    }
    let lambda = 1.0 / denom;

    let mut r1 = lambda * h1;
    let mut r2 = lambda * h2;
    let mut t = lambda * h3;
    // Board in front of the camera.
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(PoseError::DegenerateHomography);
    }

    let r = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = r.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::DegenerateHomography);
    };
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    Ok(BoardPose::from_rotation(&r_orth, t))
}

fn pose_from_params(x: &Vector6<f64>) -> BoardPose {
    BoardPose::new(Vector3::new(x[0], x[1], x[2]), Vector3::new(x[3], x[4], x[5]))
}

/// Squared reprojection error; residuals are written into `out`.
fn reprojection(
    x: &Vector6<f64>,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &Camera,
    out: &mut [f64],
) -> f64 {
    let projected = camera.project_points(object, &pose_from_params(x));
    let mut sum_sq = 0.0;
    for (i, (p, uv)) in projected.iter().zip(image).enumerate() {
        let (du, dv) = (p.x - uv.x, p.y - uv.y);
        out[2 * i] = du;
        out[2 * i + 1] = dv;
        sum_sq += du * du + dv * dv;
    }
    sum_sq
}

/// LM on `[rvec, tvec]` with a central-difference Jacobian.
fn refine_pose_lm(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &Camera,
    initial: BoardPose,
    params: &LmParams,
) -> PnpSolution {
    let n = object.len();
    let mut x = Vector6::new(
        initial.rvec.x,
        initial.rvec.y,
        initial.rvec.z,
        initial.tvec.x,
        initial.tvec.y,
        initial.tvec.z,
    );

    let mut residuals = vec![0.0; 2 * n];
    let mut scratch_p = vec![0.0; 2 * n];
    let mut scratch_m = vec![0.0; 2 * n];
    let mut jacobian = vec![[0.0f64; 6]; 2 * n];

    let mut err_sq = reprojection(&x, object, image, camera, &mut residuals);
    // Below 1e-8 px rms there is nothing left to refine.
    let floor = 2.0 * n as f64 * 1e-16;
    let mut lambda = params.lambda_init;
    let mut iterations = 0;
    let mut converged = err_sq <= floor;

    while !converged && iterations < params.max_iters {
        iterations += 1;

        const H_ROT: f64 = 1e-6;
        let h_trans = 1e-6 * x.fixed_rows::<3>(3).amax().max(1e-3);
        for k in 0..6 {
            let h = if k < 3 { H_ROT } else { h_trans };
            let mut x_plus = x;
            let mut x_minus = x;
            x_plus[k] += h;
            x_minus[k] -= h;
            reprojection(&x_plus, object, image, camera, &mut scratch_p);
            reprojection(&x_minus, object, image, camera, &mut scratch_m);
            for (row, (p, m)) in jacobian.iter_mut().zip(scratch_p.iter().zip(&scratch_m)) {
                row[k] = (p - m) / (2.0 * h);
            }
        }

        // (JᵀJ + λ diag) δ = -Jᵀ r
        let mut a = Matrix6::<f64>::zeros();
        let mut b = Vector6::<f64>::zeros();
        for (row, &r) in jacobian.iter().zip(&residuals) {
            for c in 0..6 {
                b[c] += row[c] * r;
                for d in 0..6 {
                    a[(c, d)] += row[c] * row[d];
                }
            }
        }
        for d in 0..6 {
            a[(d, d)] += lambda * a[(d, d)].max(1e-12);
        }

        let Some(delta) = a.lu().solve(&(-b)) else {
            lambda *= params.lambda_mul;
            continue;
        };

        let x_new = x + delta;
        let err_new = reprojection(&x_new, object, image, camera, &mut scratch_p);
        if err_new.is_finite() && err_new < err_sq {
            let gain = err_sq - err_new;
            x = x_new;
            residuals.copy_from_slice(&scratch_p);
            err_sq = err_new;
            lambda = (lambda / params.lambda_mul).max(1e-12);
            converged = gain <= params.rel_eps * err_sq || err_sq <= floor;
        } else {
            lambda *= params.lambda_mul;
            converged = delta.norm() <= 1e-14 * (1.0 + x.norm());
        }
    }

    PnpSolution {
        pose: pose_from_params(&x),
        rmse: (err_sq / (2.0 * n as f64)).sqrt(),
        iterations,
        converged,
    }
}
