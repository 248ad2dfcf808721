/// Errors from the pose solver and camera model.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("correspondence length mismatch: {object} object points vs {image} image points")]
    MismatchedLengths { object: usize, image: usize },

    #[error("need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },

    #[error("object points are not on the z = 0 plane")]
    NonPlanarObjectPoints,

    #[error("degenerate homography between board and image")]
    DegenerateHomography,

    #[error("invalid camera matrix: {0}")]
    InvalidIntrinsics(&'static str),
}
