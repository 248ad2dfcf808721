//! Full-grid chessboard localizer built on top of `board-pose-core`.
//!
//! ## Quickstart
//!
//! ```
//! use board_pose_chessboard::{ChessboardDetector, ChessboardParams, GridGraphParams};
//! use board_pose_core::Corner;
//!
//! let detector = ChessboardDetector::new(9, 6, ChessboardParams::default())
//!     .with_grid_search(GridGraphParams::default());
//!
//! let corners: Vec<Corner> = Vec::new();
//! assert!(detector.detect_from_corners(&corners).is_none());
//! ```
//!
//! Algorithm:
//! 1. Filter ChESS corners by strength; reject frames with fewer corners
//!    than the pattern has.
//! 2. Cluster the corner diagonals into two modes and derive global grid
//!    axes from them.
//! 3. For each corner, inspect its k nearest corners and keep at most one
//!    neighbor per grid direction; only mutual edges survive.
//! 4. BFS each connected component and assign integer coordinates.
//! 5. Cut the single complete `cols x rows` window and bring it into the
//!    canonical row-major, right-handed order.

mod detector;
mod geom;
mod gridgraph;
mod layout;
mod params;

pub use detector::{ChessboardDetection, ChessboardDetector};
pub use gridgraph::{GridAxes, GridGraph, NeighborDirection, NodeNeighbor};
pub use params::{ChessboardParams, GridGraphParams};
