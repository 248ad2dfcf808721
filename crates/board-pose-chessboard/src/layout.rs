//! From BFS labels to a row-major board index.
//!
//! BFS coordinates are only defined up to translation and a `D4` symmetry.
//! This module cuts the fully populated `cols x rows` window out of a
//! labelled component and brings it into the canonical orientation:
//! `i` runs along the `cols` axis, the board frame is right-handed in the
//! image (so board z points away from the camera) and, of the two remaining
//! candidates, the origin is the corner closest to the image top-left.

use board_pose_core::{Corner, GridCoords, GRID_TRANSFORMS_D4};
use log::debug;
use nalgebra::Vector2;
use std::collections::HashMap;

/// Occupied window of the labelled grid, in normalized label coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Window {
    i0: i32,
    j0: i32,
    width: i32,
    height: i32,
}

/// Board indices (into `corners`) in row-major order, `r * cols + c`.
pub(crate) fn extract_board(
    labels: &[(usize, GridCoords)],
    corners: &[Corner],
    cols: usize,
    rows: usize,
) -> Option<Vec<usize>> {
    let occupancy = normalize(labels);
    let window = find_window(&occupancy, cols as i32, rows as i32)?;

    let local: Vec<(i32, i32, usize)> = (0..window.height)
        .flat_map(|b| (0..window.width).map(move |a| (a, b)))
        .filter_map(|(a, b)| {
            occupancy
                .get(&(window.i0 + a, window.j0 + b))
                .map(|&idx| (a, b, idx))
        })
        .collect();

    canonical_order(&local, corners, cols, rows)
}

fn normalize(labels: &[(usize, GridCoords)]) -> HashMap<(i32, i32), usize> {
    let min_i = labels.iter().map(|(_, g)| g.i).min().unwrap_or(0);
    let min_j = labels.iter().map(|(_, g)| g.j).min().unwrap_or(0);
    labels
        .iter()
        .map(|&(idx, g)| ((g.i - min_i, g.j - min_j), idx))
        .collect()
}

/// The unique fully populated window of size `cols x rows` (either way round).
fn find_window(occupancy: &HashMap<(i32, i32), usize>, cols: i32, rows: i32) -> Option<Window> {
    let width = occupancy.keys().map(|k| k.0).max()? + 1;
    let height = occupancy.keys().map(|k| k.1).max()? + 1;

    let mut shapes = vec![(cols, rows)];
    if cols != rows {
        shapes.push((rows, cols));
    }

    let mut found = Vec::new();
    for (w, h) in shapes {
        for j0 in 0..=(height - h) {
            for i0 in 0..=(width - w) {
                let full = (j0..j0 + h).all(|j| (i0..i0 + w).all(|i| occupancy.contains_key(&(i, j))));
                if full {
                    found.push(Window {
                        i0,
                        j0,
                        width: w,
                        height: h,
                    });
                }
            }
        }
    }

    match found.as_slice() {
        [window] => Some(*window),
        [] => {
            debug!(
                "no complete {cols}x{rows} window in a {width}x{height} component ({} corners)",
                occupancy.len()
            );
            None
        }
        _ => {
            debug!("{} candidate board windows, ambiguous", found.len());
            None
        }
    }
}

/// Pick the `D4` transform giving the canonical board orientation.
fn canonical_order(
    local: &[(i32, i32, usize)],
    corners: &[Corner],
    cols: usize,
    rows: usize,
) -> Option<Vec<usize>> {
    let mut best: Option<(f32, Vec<usize>)> = None;

    for t in GRID_TRANSFORMS_D4 {
        let mapped: Vec<([i32; 2], usize)> =
            local.iter().map(|&(a, b, idx)| (t.apply(a, b), idx)).collect();
        let min_c = mapped.iter().map(|(p, _)| p[0]).min()?;
        let min_r = mapped.iter().map(|(p, _)| p[1]).min()?;

        let mut order = vec![usize::MAX; cols * rows];
        let mut fits = true;
        for ([c, r], idx) in mapped {
            let (c, r) = ((c - min_c) as usize, (r - min_r) as usize);
            if c >= cols || r >= rows {
                fits = false;
                break;
            }
            order[r * cols + c] = idx;
        }
        if !fits || order.contains(&usize::MAX) {
            continue;
        }

        if handedness(&order, corners, cols, rows) <= 0.0 {
            continue;
        }

        let origin = corners[order[0]].position;
        let score = origin.x + origin.y;
        if best.as_ref().is_none_or(|(s, _)| score < *s) {
            best = Some((score, order));
        }
    }

    best.map(|(_, order)| order)
}

/// z-component of `mean(d/dc) x mean(d/dr)` in image coordinates (y down).
///
/// Positive when the board axes appear as image x-right / y-down do, which
/// means the board normal points away from the camera.
fn handedness(order: &[usize], corners: &[Corner], cols: usize, rows: usize) -> f32 {
    let at = |c: usize, r: usize| corners[order[r * cols + c]].as_vec2();
    let mut dc = Vector2::zeros();
    let mut dr = Vector2::zeros();
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                dc += at(c + 1, r) - at(c, r);
            }
            if r + 1 < rows {
                dr += at(c, r + 1) - at(c, r);
            }
        }
    }
    dc.x * dr.y - dc.y * dr.x
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn board_corners(cols: usize, rows: usize) -> Vec<Corner> {
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (c, r)))
            .map(|(c, r)| {
                Corner::new(
                    Point2::new(100.0 + 20.0 * c as f32, 50.0 + 20.0 * r as f32),
                    0.0,
                    1.0,
                )
            })
            .collect()
    }

    #[test]
    fn recovers_row_major_order_from_rotated_labels() {
        let (cols, rows) = (4, 3);
        let corners = board_corners(cols, rows);
        // Labels as a BFS with swapped and mirrored axes would produce them.
        let labels: Vec<(usize, GridCoords)> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (c, r)))
            .map(|(c, r)| (r * cols + c, GridCoords::new(-(r as i32), -(c as i32))))
            .collect();

        let order = extract_board(&labels, &corners, cols, rows).expect("board");
        assert_eq!((0..cols * rows).collect::<Vec<_>>(), order);
    }

    #[test]
    fn crops_single_complete_window() {
        let (cols, rows) = (3, 2);
        let mut corners = board_corners(cols, rows);
        let mut labels: Vec<(usize, GridCoords)> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (c, r)))
            .map(|(c, r)| (r * cols + c, GridCoords::new(c as i32, r as i32)))
            .collect();
        // A stray corner hanging off the right edge.
        corners.push(Corner::new(Point2::new(160.0, 50.0), 0.0, 1.0));
        labels.push((6, GridCoords::new(3, 0)));

        let order = extract_board(&labels, &corners, cols, rows).expect("board");
        assert_eq!(vec![0, 1, 2, 3, 4, 5], order);
    }

    #[test]
    fn rejects_incomplete_grid() {
        let (cols, rows) = (3, 3);
        let corners = board_corners(cols, rows);
        let labels: Vec<(usize, GridCoords)> = (0..8)
            .map(|k| (k, GridCoords::new((k % 3) as i32, (k / 3) as i32)))
            .collect();
        assert!(extract_board(&labels, &corners, cols, rows).is_none());
    }
}
