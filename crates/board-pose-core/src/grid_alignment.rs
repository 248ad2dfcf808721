use serde::{Deserialize, Serialize};

/// Integer 2D grid transform (a 2×2 matrix) used to bring a labelled grid
/// into its canonical orientation.
///
/// `(i', j') = (a*i + b*j, c*i + d*j)`.
///
/// The valid transforms on a square lattice are the 8 elements of the
/// dihedral group `D4`, listed in [`GRID_TRANSFORMS_D4`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTransform {
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
}

impl GridTransform {
    pub const IDENTITY: GridTransform = GridTransform::new(1, 0, 0, 1);

    pub const fn new(a: i32, b: i32, c: i32, d: i32) -> Self {
        Self { a, b, c, d }
    }

    /// Apply the transform to `(i, j)`.
    #[inline]
    pub fn apply(&self, i: i32, j: i32) -> [i32; 2] {
        [self.a * i + self.b * j, self.c * i + self.d * j]
    }

    /// Determinant: `+1` for rotations, `-1` for reflections.
    #[inline]
    pub fn det(&self) -> i32 {
        self.a * self.d - self.b * self.c
    }
}

/// The 8 dihedral transforms `D4` on the integer grid.
pub const GRID_TRANSFORMS_D4: [GridTransform; 8] = [
    // rotations: 0°, 90°, 180°, 270°
    GridTransform::new(1, 0, 0, 1),
    GridTransform::new(0, 1, -1, 0),
    GridTransform::new(-1, 0, 0, -1),
    GridTransform::new(0, -1, 1, 0),
    // reflections
    GridTransform::new(-1, 0, 0, 1),
    GridTransform::new(1, 0, 0, -1),
    GridTransform::new(0, 1, 1, 0),
    GridTransform::new(0, -1, -1, 0),
];
