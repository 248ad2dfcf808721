use crate::gridgraph::{assign_grid_coordinates, connected_components, GridAxes, GridGraph};
use crate::layout::extract_board;
use crate::params::{ChessboardParams, GridGraphParams};
use board_pose_core::{cluster_orientations, Corner, GridCoords, GridCorner};
use log::{debug, info};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A fully localized chessboard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChessboardDetection {
    pub cols: usize,
    pub rows: usize,
    /// All `cols * rows` inner corners, row-major: index `r * cols + c`.
    pub corners: Vec<GridCorner>,
}

impl ChessboardDetection {
    /// Pixel positions in board order, ready for the pose solver.
    pub fn image_points(&self) -> Vec<Point2<f64>> {
        self.corners
            .iter()
            .map(|c| Point2::new(c.position.x as f64, c.position.y as f64))
            .collect()
    }
}

/// Chessboard localizer over a cloud of ChESS corners.
///
/// Succeeds only when every inner corner of the `cols x rows` pattern is
/// found, so the output can be paired positionally with board points.
pub struct ChessboardDetector {
    pub cols: usize,
    pub rows: usize,
    pub params: ChessboardParams,
    pub grid_search: GridGraphParams,
}

impl ChessboardDetector {
    pub fn new(cols: usize, rows: usize, params: ChessboardParams) -> Self {
        Self {
            cols,
            rows,
            params,
            grid_search: GridGraphParams::default(),
        }
    }

    pub fn with_grid_search(mut self, grid_search: GridGraphParams) -> Self {
        self.grid_search = grid_search;
        self
    }

    /// Number of inner corners the pattern has.
    pub fn expected_corners(&self) -> usize {
        self.cols * self.rows
    }

    /// Find the board in `corners`; `None` when it is not fully visible.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(corners = corners.len()))
    )]
    pub fn detect_from_corners(&self, corners: &[Corner]) -> Option<ChessboardDetection> {
        let expected = self.expected_corners();
        if self.cols < 2 || self.rows < 2 {
            debug!("degenerate pattern {}x{}", self.cols, self.rows);
            return None;
        }

        let mut strong: Vec<Corner> = corners
            .iter()
            .filter(|c| c.strength >= self.params.min_strength)
            .cloned()
            .collect();

        if strong.len() < expected {
            debug!(
                "fast check: {} corners after strength filter, need {expected}",
                strong.len()
            );
            return None;
        }

        let axes = self.cluster(&mut strong);
        if strong.len() < expected {
            debug!(
                "{} corners left after orientation clustering, need {expected}",
                strong.len()
            );
            return None;
        }

        let graph = GridGraph::new(&strong, &self.grid_search, axes.as_ref());
        let mut components = connected_components(&graph);
        components.retain(|c| c.len() >= expected);
        components.sort_by_key(|c| std::cmp::Reverse(c.len()));

        for component in &components {
            let Some(labels) = assign_grid_coordinates(&graph, component) else {
                debug!("component of {} corners is not a lattice", component.len());
                continue;
            };
            let Some(order) = extract_board(&labels, &strong, self.cols, self.rows) else {
                continue;
            };

            let corners = order
                .iter()
                .enumerate()
                .map(|(k, &idx)| GridCorner {
                    position: strong[idx].position,
                    grid: GridCoords::new((k % self.cols) as i32, (k / self.cols) as i32),
                    strength: strong[idx].strength,
                })
                .collect();

            return Some(ChessboardDetection {
                cols: self.cols,
                rows: self.rows,
                corners,
            });
        }

        debug!(
            "no {}x{} board among {} components",
            self.cols,
            self.rows,
            components.len()
        );
        None
    }

    /// Label corners with their diagonal cluster and drop outliers.
    ///
    /// Leaves `corners` untouched and returns `None` when clustering is off
    /// or does not find two modes.
    fn cluster(&self, corners: &mut Vec<Corner>) -> Option<GridAxes> {
        if !self.params.use_orientation_clustering {
            return None;
        }
        let Some(clusters) =
            cluster_orientations(corners, &self.params.orientation_clustering_params)
        else {
            info!("orientation clustering failed, using raw orientations");
            return None;
        };
        let axes = GridAxes::from_diagonals(clusters.centers)?;

        for (corner, label) in corners.iter_mut().zip(&clusters.labels) {
            corner.orientation_cluster = *label;
        }
        corners.retain(|c| c.orientation_cluster.is_some());
        Some(axes)
    }
}
