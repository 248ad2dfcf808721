use std::error::Error;

use board_pose::config::PoseConfig;
use board_pose::keys::{ChannelKeys, KeyEvents};
use board_pose::run::run_with_config;
use board_pose::video::{FrameDisplay, Headless};
use clap::Parser;
use log::{info, LevelFilter};

/// Track a chessboard in a video and draw an "H" prism on it.
///
/// While running, type Enter (or a space) on stdin to pause or resume and
/// `q` to quit. With an OpenCV window the usual Space and Esc keys work.
#[derive(Debug, Parser)]
#[command(author, version, about = "Chessboard pose estimation with an AR overlay")]
struct Args {
    /// Optional JSON config; defaults reproduce the reference capture setup.
    #[arg(long)]
    config: Option<String>,

    /// Video file or directory of frames.
    #[arg(long)]
    input: Option<String>,

    /// Output video file, or PNG directory without a video backend.
    #[arg(long)]
    output: Option<String>,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<f64>,

    /// Minimal delay between frames, in milliseconds.
    #[arg(long = "delay-ms")]
    delay_ms: Option<u64>,

    /// Do not open a window.
    #[arg(long)]
    headless: bool,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<PoseConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => PoseConfig::load_json(path)?,
            None => PoseConfig::default(),
        };
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(delay) = self.delay_ms {
            config.frame_delay_ms = delay;
        }
        Ok(config)
    }
}

fn init_logging(level: LevelFilter) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "tracing")]
    {
        let _ = level;
        board_pose::core::init_tracing(false);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        Ok(board_pose::core::init_with_level(level)?)
    }
}

#[cfg(feature = "opencv")]
fn open_ui(
    config: &PoseConfig,
    headless: bool,
) -> Result<(Box<dyn FrameDisplay>, Box<dyn KeyEvents>), Box<dyn Error>> {
    use board_pose::video::opencv::{HighguiKeys, HighguiWindow};
    if headless {
        return Ok((Box::new(Headless), Box::new(ChannelKeys::stdin())));
    }
    Ok((
        Box::new(HighguiWindow::open(&config.window_title)?),
        Box::new(HighguiKeys),
    ))
}

#[cfg(not(feature = "opencv"))]
fn open_ui(
    config: &PoseConfig,
    headless: bool,
) -> Result<(Box<dyn FrameDisplay>, Box<dyn KeyEvents>), Box<dyn Error>> {
    if !headless {
        info!("built without a window backend; '{}' is not shown", config.window_title);
    }
    Ok((Box::new(Headless), Box::new(ChannelKeys::stdin())))
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = args.resolve_config()?;

    if args.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    init_logging(args.log_level)?;
    let (mut display, mut keys) = open_ui(&config, args.headless)?;
    let summary = run_with_config(&config, display.as_mut(), keys.as_mut())?;
    if summary.stopped_by_user {
        info!("stopped by user after {} frames", summary.frames);
    }
    Ok(())
}
