use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Inner-corner layout of a planar chessboard.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChessboardSpec {
    /// Inner corners per row.
    pub cols: usize,
    /// Inner corners per column.
    pub rows: usize,
    /// Square side in world units.
    pub cell_size: f64,
}

impl Default for ChessboardSpec {
    fn default() -> Self {
        Self {
            cols: 9,
            rows: 6,
            cell_size: 0.028,
        }
    }
}

impl ChessboardSpec {
    pub fn new(cols: usize, rows: usize, cell_size: f64) -> Self {
        Self {
            cols,
            rows,
            cell_size,
        }
    }

    pub fn corner_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Board-frame corner positions; index `r * cols + c` is
    /// `(cell_size * c, cell_size * r, 0)`.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        (0..self.rows)
            .flat_map(|r| {
                (0..self.cols).map(move |c| {
                    Point3::new(self.cell_size * c as f64, self.cell_size * r as f64, 0.0)
                })
            })
            .collect()
    }
}
