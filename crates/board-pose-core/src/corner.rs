use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Canonical 2D corner fed into the chessboard localizer.
///
/// This is what you obtain by adapting the output of a ChESS corner detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Corner {
    /// Corner position in pixel coordinates.
    pub position: Point2<f32>,

    /// Dominant diagonal orientation at the corner, in radians.
    ///
    /// Defined modulo π: chessboard diagonals are undirected.
    pub orientation: f32,

    /// Orientation cluster (0 or 1) once the corner set has been clustered.
    #[serde(default)]
    pub orientation_cluster: Option<usize>,

    /// Strength / response of the corner detector.
    pub strength: f32,
}

impl Corner {
    pub fn new(position: Point2<f32>, orientation: f32, strength: f32) -> Self {
        Self {
            position,
            orientation,
            orientation_cluster: None,
            strength,
        }
    }

    /// Convenience accessor for (x, y) as a vector.
    pub fn as_vec2(&self) -> Vector2<f32> {
        Vector2::new(self.position.x, self.position.y)
    }
}

/// Integer grid coordinates (i, j) in board space.
///
/// `i` runs along the board columns, `j` along the rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GridCoords {
    pub i: i32,
    pub j: i32,
}

impl GridCoords {
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }
}

/// A localized chessboard corner with its board coordinates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridCorner {
    /// Pixel position.
    pub position: Point2<f32>,

    /// Board coordinates, `0 <= i < cols`, `0 <= j < rows`.
    pub grid: GridCoords,

    /// Detector response of the underlying corner.
    pub strength: f32,
}
