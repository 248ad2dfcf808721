use nalgebra::Vector2;
use std::f32::consts::{FRAC_PI_2, PI};

/// Absolute difference between two angles, in `[0, π]`.
pub fn angle_diff_abs(a: f32, b: f32) -> f32 {
    let diff = (b - a).rem_euclid(2.0 * PI);
    if diff >= PI {
        2.0 * PI - diff
    } else {
        diff
    }
}

/// Whether two directions are orthogonal within `tolerance` radians.
pub fn is_orthogonal(reference_angle: f32, other_angle: f32, tolerance: f32) -> bool {
    (FRAC_PI_2 - angle_diff_abs(reference_angle, other_angle)).abs() <= tolerance.abs()
}

/// Angle between an undirected axis (modulo π) and a directed vector angle, in `[0, π/2]`.
pub fn axis_vec_diff(axis_angle: f32, vec_angle: f32) -> f32 {
    let d = angle_diff_abs(axis_angle, vec_angle);
    d.min(PI - d)
}

#[inline]
pub fn angle_to_unit(theta: f32) -> Vector2<f32> {
    Vector2::new(theta.cos(), theta.sin())
}
