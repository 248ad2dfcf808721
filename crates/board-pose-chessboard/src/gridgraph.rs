//! 4-connected corner graph and integer grid labelling.

use crate::geom::{angle_diff_abs, angle_to_unit, axis_vec_diff, is_orthogonal};
use crate::params::GridGraphParams;
use board_pose_core::{Corner, GridCoords};
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;
use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

/// Direction of a graph edge in grid terms.
///
/// `Right`/`Left` run along the first grid axis, `Down`/`Up` along the
/// second. Which image direction that is depends on [`GridAxes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Right,
    Left,
    Up,
    Down,
}

impl NeighborDirection {
    pub fn opposite(self) -> Self {
        match self {
            NeighborDirection::Right => NeighborDirection::Left,
            NeighborDirection::Left => NeighborDirection::Right,
            NeighborDirection::Up => NeighborDirection::Down,
            NeighborDirection::Down => NeighborDirection::Up,
        }
    }

    /// Grid step `(di, dj)` taken along this direction.
    pub fn step(self) -> (i32, i32) {
        match self {
            NeighborDirection::Right => (1, 0),
            NeighborDirection::Left => (-1, 0),
            NeighborDirection::Up => (0, -1),
            NeighborDirection::Down => (0, 1),
        }
    }

    fn slot(self) -> usize {
        match self {
            NeighborDirection::Right => 0,
            NeighborDirection::Left => 1,
            NeighborDirection::Up => 2,
            NeighborDirection::Down => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    pub score: f32,
}

/// Global grid axes in the image, derived from the two diagonal clusters.
///
/// With unit diagonals `o0`, `o1` the grid axes are `o0 + o1` and `o0 - o1`,
/// which are orthogonal whatever the angle between the diagonals.
#[derive(Clone, Copy, Debug)]
pub struct GridAxes {
    pub diagonals: [f32; 2],
    pub u: Vector2<f32>,
    pub v: Vector2<f32>,
}

impl GridAxes {
    pub fn from_diagonals(diagonals: [f32; 2]) -> Option<Self> {
        let o0 = angle_to_unit(diagonals[0]);
        let o1 = angle_to_unit(diagonals[1]);
        let u = o0 + o1;
        let v = o0 - o1;
        if u.norm_squared() < 1e-6 || v.norm_squared() < 1e-6 {
            return None;
        }
        Some(Self {
            diagonals,
            u: u.normalize(),
            v: v.normalize(),
        })
    }

    fn classify(&self, e: &Vector2<f32>) -> NeighborDirection {
        let a = e.dot(&self.u);
        let b = e.dot(&self.v);
        if a.abs() >= b.abs() {
            if a >= 0.0 {
                NeighborDirection::Right
            } else {
                NeighborDirection::Left
            }
        } else if b >= 0.0 {
            NeighborDirection::Down
        } else {
            NeighborDirection::Up
        }
    }
}

fn direction_quadrant(vec_to_neighbor: &Vector2<f32>) -> NeighborDirection {
    if vec_to_neighbor.x.abs() > vec_to_neighbor.y.abs() {
        if vec_to_neighbor.x >= 0.0 {
            NeighborDirection::Right
        } else {
            NeighborDirection::Left
        }
    } else if vec_to_neighbor.y >= 0.0 {
        NeighborDirection::Down
    } else {
        NeighborDirection::Up
    }
}

/// Edge candidate between corners of opposite diagonal clusters.
fn is_good_neighbor_with_axes(
    corner: &Corner,
    neighbor: &Corner,
    neighbor_index: usize,
    params: &GridGraphParams,
    axes: &GridAxes,
) -> Option<NodeNeighbor> {
    let (Some(ci), Some(cj)) = (corner.orientation_cluster, neighbor.orientation_cluster) else {
        return None;
    };
    if ci == cj {
        return None;
    }

    let vec_to_neighbor = neighbor.position - corner.position;
    let distance = vec_to_neighbor.norm();
    if distance < params.min_spacing_pix || distance > params.max_spacing_pix {
        return None;
    }
    let e = vec_to_neighbor / distance;

    // Local grid axes from the two raw diagonals; these follow perspective
    // better than the global axes.
    let oi = angle_to_unit(corner.orientation);
    let oj = angle_to_unit(neighbor.orientation);
    let alignment = [oi + oj, oi - oj]
        .iter()
        .filter(|v| v.norm_squared() > 1e-6)
        .map(|v| v.normalize().dot(&e).abs())
        .fold(0.0f32, f32::max);

    if alignment < params.orientation_tolerance_deg.to_radians().cos() {
        return None;
    }

    // Nearest well-aligned corner wins; a corner two cells away can be
    // aligned just as well.
    Some(NodeNeighbor {
        direction: axes.classify(&e),
        index: neighbor_index,
        distance,
        score: distance / alignment,
    })
}

/// Edge candidate from raw orientations only.
///
/// Diagonals of adjacent corners are orthogonal and the edge between them
/// runs at 45° to both.
fn is_good_neighbor(
    corner: &Corner,
    neighbor: &Corner,
    neighbor_index: usize,
    params: &GridGraphParams,
) -> Option<NodeNeighbor> {
    let tol = params.orientation_tolerance_deg.to_radians();
    if !is_orthogonal(corner.orientation, neighbor.orientation, tol) {
        return None;
    }

    let vec_to_neighbor = neighbor.position - corner.position;
    let distance = vec_to_neighbor.norm();
    if distance < params.min_spacing_pix || distance > params.max_spacing_pix {
        return None;
    }

    let edge_angle = vec_to_neighbor.y.atan2(vec_to_neighbor.x);
    let score_corner = (axis_vec_diff(corner.orientation, edge_angle) - FRAC_PI_4).abs();
    let score_neighbor = (axis_vec_diff(neighbor.orientation, edge_angle) - FRAC_PI_4).abs();
    if score_corner > tol || score_neighbor > tol {
        return None;
    }

    let score_orientation =
        (FRAC_PI_2 - angle_diff_abs(corner.orientation, neighbor.orientation)).abs();

    Some(NodeNeighbor {
        direction: direction_quadrant(&vec_to_neighbor),
        index: neighbor_index,
        distance,
        score: score_corner + score_neighbor + score_orientation,
    })
}

/// Keep at most one neighbor per direction: lowest score, then shortest.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> [Option<NodeNeighbor>; 4] {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates {
        let slot = &mut best[candidate.direction.slot()];
        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.score < current.score
                    || (candidate.score == current.score && candidate.distance < current.distance)
            }
        };
        if replace {
            *slot = Some(candidate);
        }
    }

    best
}

pub struct GridGraph {
    /// Per node, the accepted neighbors (at most one per direction).
    pub neighbors: Vec<Vec<NodeNeighbor>>,
}

impl GridGraph {
    /// Build the graph over `corners`.
    ///
    /// With `axes`, corners must carry an `orientation_cluster` and edges
    /// are labelled against the global grid axes. Without, edges are
    /// labelled by image quadrant. Only mutual edges (`a -> b` in direction
    /// `d` and `b -> a` in the opposite one) survive.
    pub fn new(corners: &[Corner], params: &GridGraphParams, axes: Option<&GridAxes>) -> Self {
        if corners.is_empty() {
            return Self {
                neighbors: Vec::new(),
            };
        }

        let coords = corners
            .iter()
            .map(|c| [c.position.x, c.position.y])
            .collect::<Vec<_>>();
        let tree: KdTree<f32, 2> = (&coords).into();

        let selected: Vec<[Option<NodeNeighbor>; 4]> = corners
            .iter()
            .enumerate()
            .map(|(i, corner)| {
                let query_point = [corner.position.x, corner.position.y];
                let candidates = tree
                    .nearest_n::<SquaredEuclidean>(&query_point, params.k_neighbors + 1)
                    .into_iter()
                    .map(|nn| nn.item as usize)
                    .filter(|&j| j != i)
                    .filter_map(|j| match axes {
                        Some(axes) => {
                            is_good_neighbor_with_axes(corner, &corners[j], j, params, axes)
                        }
                        None => is_good_neighbor(corner, &corners[j], j, params),
                    })
                    .collect();
                select_neighbors(candidates)
            })
            .collect();

        let neighbors = selected
            .iter()
            .enumerate()
            .map(|(i, slots)| {
                slots
                    .iter()
                    .flatten()
                    .filter(|n| {
                        selected[n.index][n.direction.opposite().slot()]
                            .as_ref()
                            .is_some_and(|back| back.index == i)
                    })
                    .cloned()
                    .collect()
            })
            .collect();

        Self { neighbors }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Connected components, each as a list of node indices.
pub fn connected_components(graph: &GridGraph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.len()];
    let mut components = Vec::new();

    for start in 0..graph.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(node) = stack.pop() {
            component.push(node);
            for neighbor in &graph.neighbors[node] {
                if !visited[neighbor.index] {
                    visited[neighbor.index] = true;
                    stack.push(neighbor.index);
                }
            }
        }

        components.push(component);
    }

    components
}

/// BFS a component from its first node and give every node integer coordinates.
///
/// Returns `None` when two nodes land on the same coordinates, which happens
/// when the edges are not consistent with a lattice.
pub fn assign_grid_coordinates(
    graph: &GridGraph,
    component: &[usize],
) -> Option<Vec<(usize, GridCoords)>> {
    let &start = component.first()?;
    let mut assigned: Vec<Option<GridCoords>> = vec![None; graph.len()];
    let mut coords = Vec::with_capacity(component.len());
    let mut queue = VecDeque::new();

    assigned[start] = Some(GridCoords::new(0, 0));
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        let here = assigned[node]?;
        coords.push((node, here));

        for neighbor in &graph.neighbors[node] {
            let (di, dj) = neighbor.direction.step();
            let there = GridCoords::new(here.i + di, here.j + dj);
            match assigned[neighbor.index] {
                Some(existing) if existing != there => return None,
                Some(_) => {}
                None => {
                    assigned[neighbor.index] = Some(there);
                    queue.push_back(neighbor.index);
                }
            }
        }
    }

    let mut seen: Vec<GridCoords> = coords.iter().map(|(_, g)| *g).collect();
    seen.sort_unstable_by_key(|g| (g.j, g.i));
    seen.dedup();
    (seen.len() == coords.len()).then_some(coords)
}
