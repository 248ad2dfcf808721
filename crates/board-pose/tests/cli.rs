#![cfg(feature = "cli")]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use board_pose::config::PoseConfig;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::{tempdir, NamedTempFile};

fn board_pose() -> Command {
    Command::cargo_bin("board-pose").expect("binary built")
}

fn write_frames(dir: &Path, n: u8) -> Vec<RgbImage> {
    (0..n)
        .map(|i| {
            let img = RgbImage::from_pixel(64, 48, Rgb([i * 20, 100, 200]));
            img.save(dir.join(format!("in_{i:03}.png"))).expect("save frame");
            img
        })
        .collect()
}

#[test]
fn missing_input_aborts_at_startup() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("missing");
    let output = dir.path().join("out");

    board_pose()
        .args(["--headless", "--log-level", "off", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read the given input, "));
    assert!(!output.exists());
}

#[test]
fn headless_run_copies_frames_without_a_board() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("frames");
    fs::create_dir(&input).expect("mkdir");
    let originals = write_frames(&input, 3);
    let output = dir.path().join("annotated");

    board_pose()
        .args(["--headless", "--delay-ms", "0", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("processed 3 frames: 0 posed"));

    for (i, orig) in originals.iter().enumerate() {
        let written = image::open(output.join(format!("frame_{i:06}.png")))
            .expect("output frame")
            .to_rgb8();
        assert_eq!(orig, &written);
    }
}

#[test]
fn dump_config_prints_defaults() {
    board_pose()
        .arg("--dump-config")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"cell_size\": 0.028")
                .and(predicate::str::contains("Pose Estimation (Chessboard)"))
                .and(predicate::str::contains("pose_estimation_h.mp4")),
        );
}

#[test]
fn config_file_and_flags_are_merged() {
    let mut cfg = PoseConfig::default();
    cfg.input = "from_file".to_owned();
    cfg.board.cols = 7;
    let file = NamedTempFile::new().expect("tempfile");
    cfg.write_json(file.path()).expect("write config");

    let out = board_pose()
        .arg("--config")
        .arg(file.path())
        .args(["--fps", "30", "--dump-config"])
        .output()
        .expect("run");
    assert!(out.status.success());

    let dumped: PoseConfig = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!("from_file", dumped.input);
    assert_eq!(7, dumped.board.cols);
    assert_eq!(30.0, dumped.fps);
}

#[test]
fn malformed_config_is_reported() {
    let file = NamedTempFile::new().expect("tempfile");
    fs::write(file.path(), "{ not json").expect("write");

    board_pose()
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: "));
}
