use board_pose_geometry::{solve_pnp, BoardPose, Camera, ChessboardSpec};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Vector3;

fn reference_camera() -> Camera {
    Camera::from_k_dist(
        &[
            [1.63243490e+03, 0.0, 7.29840790e+02],
            [0.0, 1.63197867e+03, 5.41535124e+02],
            [0.0, 0.0, 1.0],
        ],
        [
            2.74755274e-01,
            -1.23648857e+00,
            6.93900545e-04,
            2.07391502e-03,
            1.84649263e+00,
        ],
    )
    .expect("valid camera")
}

fn bench_pnp(c: &mut Criterion) {
    let camera = reference_camera();
    let board = ChessboardSpec::default();
    let object = board.object_points();
    let truth = BoardPose::new(Vector3::new(0.2, -0.3, 0.05), Vector3::new(-0.1, -0.07, 0.5));
    let mut image = camera.project_points(&object, &truth);
    for (k, p) in image.iter_mut().enumerate() {
        p.x += 0.2 * ((k % 5) as f64 - 2.0) / 2.0;
        p.y -= 0.2 * ((k % 3) as f64 - 1.0);
    }

    c.bench_function("solve_pnp_9x6", |b| {
        b.iter(|| solve_pnp(black_box(&object), black_box(&image), &camera).expect("pose"))
    });

    c.bench_function("project_24_points", |b| {
        let pts: Vec<_> = object.iter().take(24).copied().collect();
        b.iter(|| camera.project_points(black_box(&pts), &truth))
    });
}

criterion_group!(benches, bench_pnp);
criterion_main!(benches);
