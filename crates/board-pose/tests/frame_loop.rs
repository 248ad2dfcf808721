use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use board_pose::detect::PatternLocator;
use board_pose::geometry::{BoardPose, BrownConrady, Camera, CameraIntrinsics, ChessboardSpec};
use board_pose::keys::{ChannelKeys, Key, NoKeys};
use board_pose::pipeline::PoseEstimator;
use board_pose::run::{run_pose_loop, Pacer};
use board_pose::video::{Headless, MemorySink, MemorySource};
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Vector3};

fn camera() -> Camera {
    Camera::new(
        CameraIntrinsics::new(500.0, 500.0, 160.0, 120.0),
        BrownConrady::default(),
    )
}

fn frames(n: u8) -> Vec<RgbImage> {
    (0..n)
        .map(|i| RgbImage::from_pixel(320, 240, Rgb([i * 10, i * 10, i * 10])))
        .collect()
}

/// Never finds the board.
struct Blind;

impl PatternLocator for Blind {
    fn locate(&self, _frame: &RgbImage) -> Option<Vec<Point2<f64>>> {
        None
    }
}

/// Finds the board on every `every`-th frame, at a fixed pose.
struct Synthetic {
    points: Vec<Point2<f64>>,
    every: usize,
    calls: AtomicUsize,
}

impl Synthetic {
    fn new(every: usize) -> Self {
        let board = ChessboardSpec::default();
        let pose = BoardPose::new(Vector3::new(0.2, 0.1, -0.1), Vector3::new(-0.11, -0.07, 0.55));
        Self {
            points: camera().project_points(&board.object_points(), &pose),
            every,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PatternLocator for Synthetic {
    fn locate(&self, _frame: &RgbImage) -> Option<Vec<Point2<f64>>> {
        let k = self.calls.fetch_add(1, Ordering::Relaxed);
        (k % self.every == 0).then(|| self.points.clone())
    }
}

fn first_value(frames: &[RgbImage]) -> Vec<u8> {
    frames.iter().map(|f| f.get_pixel(300, 200).0[0]).collect()
}

#[test]
fn every_frame_is_written_once_in_order() {
    let est = PoseEstimator::new(Blind, camera(), &ChessboardSpec::default());
    let mut source = MemorySource::new(frames(5));
    let mut sink = MemorySink::default();

    let summary = run_pose_loop(
        &est,
        &mut source,
        &mut sink,
        &mut Headless,
        &mut NoKeys,
        &mut Pacer::new(Duration::ZERO),
    )
    .expect("loop");

    assert_eq!(5, summary.frames);
    assert_eq!(5, summary.no_pattern);
    assert!(!summary.stopped_by_user);
    assert!(sink.finished);
    assert_eq!(frames(5), sink.frames);
}

#[test]
fn pause_waits_for_a_key_and_resumes_without_skipping() {
    let est = PoseEstimator::new(Blind, camera(), &ChessboardSpec::default());
    let mut source = MemorySource::new(frames(6));
    let mut sink = MemorySink::default();
    let (tx, mut keys) = ChannelKeys::channel();
    tx.send(Key::Space).expect("send");

    let resume = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        tx.send(Key::Other('r')).expect("send");
        tx
    });

    let start = Instant::now();
    let summary = run_pose_loop(
        &est,
        &mut source,
        &mut sink,
        &mut Headless,
        &mut keys,
        &mut Pacer::new(Duration::ZERO),
    )
    .expect("loop");
    let _tx = resume.join().expect("join");

    assert!(start.elapsed() >= Duration::from_millis(60));
    assert_eq!(1, summary.pauses);
    assert_eq!(6, summary.frames);
    assert_eq!(vec![0, 10, 20, 30, 40, 50], first_value(&sink.frames));
}

#[test]
fn escape_while_paused_stops_after_the_current_frame() {
    let est = PoseEstimator::new(Blind, camera(), &ChessboardSpec::default());
    let mut source = MemorySource::new(frames(4));
    let mut sink = MemorySink::default();
    let (tx, mut keys) = ChannelKeys::channel();
    tx.send(Key::Space).expect("send");
    tx.send(Key::Escape).expect("send");

    let summary = run_pose_loop(
        &est,
        &mut source,
        &mut sink,
        &mut Headless,
        &mut keys,
        &mut Pacer::new(Duration::ZERO),
    )
    .expect("loop");

    assert!(summary.stopped_by_user);
    assert_eq!(1, summary.frames);
    assert_eq!(vec![0], first_value(&sink.frames));
    assert!(sink.finished);
}

#[test]
fn escape_while_running_stops() {
    let est = PoseEstimator::new(Blind, camera(), &ChessboardSpec::default());
    let mut source = MemorySource::new(frames(4));
    let mut sink = MemorySink::default();
    let (tx, mut keys) = ChannelKeys::channel();
    tx.send(Key::Other('a')).expect("send");
    tx.send(Key::Escape).expect("send");

    let summary = run_pose_loop(
        &est,
        &mut source,
        &mut sink,
        &mut Headless,
        &mut keys,
        &mut Pacer::new(Duration::ZERO),
    )
    .expect("loop");

    assert!(summary.stopped_by_user);
    assert_eq!(2, summary.frames);
}

#[test]
fn closed_input_during_pause_stops_without_a_user_stop() {
    let est = PoseEstimator::new(Blind, camera(), &ChessboardSpec::default());
    let mut source = MemorySource::new(frames(3));
    let mut sink = MemorySink::default();
    let (tx, mut keys) = ChannelKeys::channel();
    tx.send(Key::Space).expect("send");
    drop(tx);

    let summary = run_pose_loop(
        &est,
        &mut source,
        &mut sink,
        &mut Headless,
        &mut keys,
        &mut Pacer::new(Duration::ZERO),
    )
    .expect("loop");

    assert!(!summary.stopped_by_user);
    assert_eq!(1, summary.pauses);
    assert_eq!(1, sink.frames.len());
    assert!(sink.finished);
}

#[test]
fn closed_input_while_running_keeps_going() {
    let est = PoseEstimator::new(Blind, camera(), &ChessboardSpec::default());
    let mut source = MemorySource::new(frames(3));
    let mut sink = MemorySink::default();
    let (tx, mut keys) = ChannelKeys::channel();
    drop(tx);

    let summary = run_pose_loop(
        &est,
        &mut source,
        &mut sink,
        &mut Headless,
        &mut keys,
        &mut Pacer::new(Duration::ZERO),
    )
    .expect("loop");

    assert!(!summary.stopped_by_user);
    assert_eq!(3, summary.frames);
    assert_eq!(frames(3), sink.frames);
}

#[test]
fn only_frames_with_a_board_are_annotated() {
    let est = PoseEstimator::new(Synthetic::new(2), camera(), &ChessboardSpec::default());
    let input = frames(4);
    let mut source = MemorySource::new(input.clone());
    let mut sink = MemorySink::default();

    let summary = run_pose_loop(
        &est,
        &mut source,
        &mut sink,
        &mut Headless,
        &mut NoKeys,
        &mut Pacer::new(Duration::ZERO),
    )
    .expect("loop");

    assert_eq!(2, summary.posed);
    assert_eq!(2, summary.no_pattern);
    for (i, (out, orig)) in sink.frames.iter().zip(&input).enumerate() {
        if i % 2 == 0 {
            assert_ne!(orig, out, "frame {i} should carry the overlay");
        } else {
            assert_eq!(orig, out, "frame {i} should be untouched");
        }
    }

    let overlay = &sink.frames[0];
    let has = |c: [u8; 3]| overlay.pixels().any(|p| p.0 == c);
    assert!(has([0, 0, 255]));
    assert!(has([255, 0, 0]));
    assert!(has([0, 255, 0]));
}
