//! Core types and utilities for chessboard pose estimation.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete corner detector, image type or camera model.

mod corner;
mod grid_alignment;
mod homography;
mod logger;
mod orientation;

pub use corner::{Corner, GridCoords, GridCorner};
pub use grid_alignment::{GridTransform, GRID_TRANSFORMS_D4};
pub use homography::{estimate_homography, homography_from_4pt, Homography};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
pub use orientation::{
    cluster_orientations, OrientationClusteringParams, OrientationClusteringResult,
};
