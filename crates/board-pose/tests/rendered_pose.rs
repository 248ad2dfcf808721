//! A chessboard rendered through the default camera is found, posed and
//! annotated, and the camera position comes back.

use board_pose::config::PoseConfig;
use board_pose::geometry::{BoardPose, Camera, ChessboardSpec};
use board_pose::pipeline::{FrameOutcome, PoseEstimator};
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Point3, Vector2, Vector3};
use std::f64::consts::FRAC_PI_4;

const WIDTH: u32 = 1460;
const HEIGHT: u32 = 1080;
const SUBSAMPLES: usize = 4;

/// Pose with the board center on the optical axis at `distance`.
fn facing(rvec: Vector3<f64>, distance: f64, board: &ChessboardSpec) -> BoardPose {
    let c = board.cell_size;
    let center = Vector3::new(
        0.5 * c * (board.cols - 1) as f64,
        0.5 * c * (board.rows - 1) as f64,
        0.0,
    );
    let r = BoardPose::new(rvec, Vector3::zeros()).rotation_matrix();
    BoardPose::new(rvec, Vector3::new(0.0, 0.0, distance) - r * center)
}

/// Board-plane point, in cells, seen through pixel position `p`.
fn board_cells(camera: &Camera, pose: &BoardPose, cell: f64, p: Point2<f64>) -> Vector2<f64> {
    let n = camera.undistort_pixel(p);
    let rt = pose.rotation_matrix().transpose();
    let ray = rt * Vector3::new(n.x, n.y, 1.0);
    let offset = rt * pose.tvec;
    let hit = (offset.z / ray.z) * ray - offset;
    Vector2::new(hit.x, hit.y) / cell
}

/// White frame with the full board (outer squares included) drawn through
/// the camera's distortion. Board coordinates are evaluated once per pixel
/// corner and interpolated for the subsamples.
fn render(camera: &Camera, pose: &BoardPose, board: &ChessboardSpec) -> RgbImage {
    let (c, cols, rows) = (board.cell_size, board.cols as f64, board.rows as f64);
    let outline = [
        Point3::new(-c, -c, 0.0),
        Point3::new(cols * c, -c, 0.0),
        Point3::new(cols * c, rows * c, 0.0),
        Point3::new(-c, rows * c, 0.0),
    ];
    let projected = camera.project_points(&outline, pose);
    let span = |f: fn(&Point2<f64>) -> f64, max: u32| {
        let lo = projected.iter().map(f).fold(f64::INFINITY, f64::min);
        let hi = projected.iter().map(f).fold(f64::NEG_INFINITY, f64::max);
        let lo = (lo.floor() - 4.0).max(0.0) as u32;
        let hi = ((hi.ceil() + 4.0) as u32).min(max - 1);
        (lo, hi)
    };
    let (x0, x1) = span(|p| p.x, WIDTH);
    let (y0, y1) = span(|p| p.y, HEIGHT);

    // Pixel (x, y) covers [x - 0.5, x + 0.5) x [y - 0.5, y + 0.5).
    let lattice_w = (x1 - x0 + 2) as usize;
    let lattice: Vec<Vector2<f64>> = (y0..=y1 + 1)
        .flat_map(|y| (x0..=x1 + 1).map(move |x| (x, y)))
        .map(|(x, y)| {
            let p = Point2::new(x as f64 - 0.5, y as f64 - 0.5);
            board_cells(camera, pose, c, p)
        })
        .collect();

    let dark = |b: Vector2<f64>| {
        (-1.0..cols).contains(&b.x)
            && (-1.0..rows).contains(&b.y)
            && (b.x.floor() as i64 + b.y.floor() as i64).rem_euclid(2) == 0
    };

    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([255, 255, 255]));
    for y in y0..=y1 {
        for x in x0..=x1 {
            let k = (y - y0) as usize * lattice_w + (x - x0) as usize;
            let (tl, tr) = (lattice[k], lattice[k + 1]);
            let (bl, br) = (lattice[k + lattice_w], lattice[k + lattice_w + 1]);

            let mut hits = 0usize;
            for sy in 0..SUBSAMPLES {
                let v = (sy as f64 + 0.5) / SUBSAMPLES as f64;
                for sx in 0..SUBSAMPLES {
                    let u = (sx as f64 + 0.5) / SUBSAMPLES as f64;
                    let top = tl + (tr - tl) * u;
                    let bottom = bl + (br - bl) * u;
                    if dark(top + (bottom - top) * v) {
                        hits += 1;
                    }
                }
            }
            let level = (255 - 255 * hits / (SUBSAMPLES * SUBSAMPLES)) as u8;
            img.put_pixel(x, y, Rgb([level, level, level]));
        }
    }
    img
}

fn assert_recovers(truth: BoardPose) {
    let config = PoseConfig::default();
    let camera = config.camera().expect("default camera");
    let estimator = PoseEstimator::new(
        config.locator().expect("default locator"),
        camera,
        &config.board,
    );

    let mut frame = render(&camera, &truth, &config.board);
    let original = frame.clone();
    match estimator.process(&mut frame) {
        FrameOutcome::Posed(solution) => {
            let got = solution.pose.camera_position();
            let want = truth.camera_position();
            assert!(solution.rmse < 0.5, "rmse {:.3}px", solution.rmse);
            assert!(
                (got.0 - want.0).norm() < 5e-3,
                "recovered {got}, rendered at {want}"
            );
        }
        other => panic!("expected a pose, got {other:?}"),
    }
    assert_ne!(original, frame, "overlay should be drawn");
}

#[test]
fn tilted_board_position_is_recovered() {
    let board = ChessboardSpec::default();
    assert_recovers(facing(Vector3::new(0.2, -0.15, 0.05), 0.8, &board));
}

#[test]
fn board_turned_in_plane_keeps_its_origin() {
    let board = ChessboardSpec::default();
    assert_recovers(facing(Vector3::new(0.1, 0.0, FRAC_PI_4), 0.8, &board));
}
