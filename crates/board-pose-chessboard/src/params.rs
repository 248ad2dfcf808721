use board_pose_core::OrientationClusteringParams;
use serde::{Deserialize, Serialize};

/// Neighbor search parameters for the corner graph.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    /// Shortest accepted distance between adjacent corners, in pixels.
    pub min_spacing_pix: f32,
    /// Longest accepted distance between adjacent corners, in pixels.
    pub max_spacing_pix: f32,
    /// Number of nearest corners inspected per node.
    pub k_neighbors: usize,
    /// Angular tolerance for edge/axis agreement, in degrees.
    pub orientation_tolerance_deg: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 5.0,
            max_spacing_pix: 400.0,
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
        }
    }
}

/// Parameters of the chessboard localizer.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessboardParams {
    /// Minimal corner strength to consider.
    pub min_strength: f32,

    /// Cluster ChESS orientations into two grid diagonals before building the graph.
    ///
    /// Without clustering the graph falls back to pairwise orientation checks
    /// and image-quadrant direction labels.
    pub use_orientation_clustering: bool,
    pub orientation_clustering_params: OrientationClusteringParams,
}

impl Default for ChessboardParams {
    fn default() -> Self {
        Self {
            min_strength: 0.0,
            use_orientation_clustering: true,
            orientation_clustering_params: OrientationClusteringParams::default(),
        }
    }
}
