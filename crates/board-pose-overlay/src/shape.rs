use nalgebra::Point3;

/// Outline of the "H" in board cells, counter-clockwise from the top of the right leg.
pub const H_OUTLINE_CELLS: [(f64, f64); 12] = [
    (5.0, 0.0),
    (6.0, 0.0),
    (6.0, 5.0),
    (5.0, 5.0),
    (5.0, 3.0),
    (3.0, 3.0),
    (3.0, 5.0),
    (2.0, 5.0),
    (2.0, 0.0),
    (3.0, 0.0),
    (3.0, 2.0),
    (5.0, 2.0),
];

/// A prism given by two rings of equal length; vertex `i` of the lower
/// ring is joined to vertex `i` of the upper ring.
#[derive(Clone, Debug, PartialEq)]
pub struct ArShape {
    pub lower: Vec<Point3<f64>>,
    pub upper: Vec<Point3<f64>>,
}

impl ArShape {
    /// The "H" extruded one cell towards the camera (board z = -cell_size).
    pub fn h_prism(cell_size: f64) -> Self {
        Self::extrude(&H_OUTLINE_CELLS, cell_size, -1.0)
    }

    /// Extrude an outline given in cells by `height` cells along board z.
    pub fn extrude(outline: &[(f64, f64)], cell_size: f64, height: f64) -> Self {
        let ring = |z: f64| -> Vec<Point3<f64>> {
            outline
                .iter()
                .map(|&(x, y)| Point3::new(x * cell_size, y * cell_size, z * cell_size))
                .collect()
        };
        Self {
            lower: ring(0.0),
            upper: ring(height),
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }
}
