//! The interactive frame loop.

use crate::config::{ConfigError, PoseConfig};
use crate::detect::PatternLocator;
use crate::keys::{Key, KeyEvents};
use crate::pipeline::{FrameOutcome, PoseEstimator};
use crate::video::{FrameDisplay, FrameSink, FrameSource, VideoError};
use log::{debug, info};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Video(#[from] VideoError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Loop states.
///
/// `on_key` takes the result of a key read: a poll while running (`None` is
/// "no key yet") or a blocking wait while paused (`None` is "input closed").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    Stopped,
}

impl LoopState {
    pub fn on_key(self, key: Option<Key>) -> LoopState {
        match (self, key) {
            (LoopState::Stopped, _) => LoopState::Stopped,
            (_, Some(Key::Escape)) => LoopState::Stopped,
            (LoopState::Running, Some(Key::Space)) => LoopState::Paused,
            (LoopState::Running, _) => LoopState::Running,
            (LoopState::Paused, Some(_)) => LoopState::Running,
            (LoopState::Paused, None) => LoopState::Stopped,
        }
    }
}

/// Fixed-interval frame pacing: sleeps until the next deadline.
///
/// A frame that took longer than the interval is not caught up on; the next
/// deadline is measured from now.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    next: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn wait(&mut self) {
        let now = Instant::now();
        let deadline = *self.next.get_or_insert(now + self.interval);
        if deadline > now {
            thread::sleep(deadline - now);
        }
        self.next = Some(deadline.max(Instant::now()) + self.interval);
    }

    /// Forget the schedule, e.g. after a pause.
    pub fn reset(&mut self) {
        self.next = None;
    }
}

/// Per-run counters, logged when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: usize,
    pub posed: usize,
    pub no_pattern: usize,
    pub pose_failed: usize,
    pub pauses: usize,
    /// Escape ended the run; a closed key input does not count.
    pub stopped_by_user: bool,
}

impl LoopSummary {
    fn record(&mut self, outcome: &FrameOutcome) {
        self.frames += 1;
        match outcome {
            FrameOutcome::Posed(_) => self.posed += 1,
            FrameOutcome::NoPattern => self.no_pattern += 1,
            FrameOutcome::PoseFailed(_) => self.pose_failed += 1,
        }
    }
}

/// Read, annotate, write and show frames until the source ends or the user
/// stops.
///
/// Every frame read is written and shown exactly once, whether or not it got
/// an overlay. Pausing happens between frames.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn run_pose_loop<L: PatternLocator>(
    estimator: &PoseEstimator<L>,
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    display: &mut dyn FrameDisplay,
    keys: &mut dyn KeyEvents,
    pacer: &mut Pacer,
) -> Result<LoopSummary, RunError> {
    let mut summary = LoopSummary::default();
    let mut state = LoopState::Running;

    while state == LoopState::Running {
        let Some(mut frame) = source.next_frame() else {
            debug!("end of stream");
            break;
        };

        let outcome = estimator.process(&mut frame);
        if let FrameOutcome::Posed(solution) = &outcome {
            debug!(
                "frame {}: {} (rmse {:.3}px)",
                summary.frames,
                solution.pose.camera_position(),
                solution.rmse
            );
        }
        summary.record(&outcome);

        sink.write(&frame)?;
        display.show(&frame)?;

        pacer.wait();
        let mut key = keys.poll();
        state = state.on_key(key);
        if state == LoopState::Paused {
            info!("paused after frame {}; press a key to resume", summary.frames);
            summary.pauses += 1;
            key = keys.wait();
            state = state.on_key(key);
            pacer.reset();
        }
        if state == LoopState::Stopped {
            summary.stopped_by_user = key == Some(Key::Escape);
            if !summary.stopped_by_user {
                info!("key input closed while paused; stopping");
            }
        }
    }

    sink.finish()?;
    info!(
        "processed {} frames: {} posed, {} without pattern, {} pose failures",
        summary.frames, summary.posed, summary.no_pattern, summary.pose_failed
    );
    Ok(summary)
}

/// Run with the backends selected by `config` and the enabled features.
///
/// Fails before the first frame when the input cannot be opened.
pub fn run_with_config(
    config: &PoseConfig,
    display: &mut dyn FrameDisplay,
    keys: &mut dyn KeyEvents,
) -> Result<LoopSummary, RunError> {
    config.validate()?;
    let estimator = PoseEstimator::new(config.locator()?, config.camera()?, &config.board);

    let mut source = crate::video::open_source(&config.input)?;
    let mut sink = open_sink(config, source.frame_size())?;
    let mut pacer = Pacer::new(config.frame_delay());

    run_pose_loop(
        &estimator,
        source.as_mut(),
        sink.as_mut(),
        display,
        keys,
        &mut pacer,
    )
}

fn open_sink(
    config: &PoseConfig,
    size: Option<(u32, u32)>,
) -> Result<Box<dyn FrameSink>, VideoError> {
    #[cfg(feature = "opencv")]
    {
        let is_file = std::path::Path::new(&config.output).extension().is_some();
        if let Some(size) = size.filter(|_| is_file) {
            return Ok(Box::new(crate::video::opencv::VideoFileSink::create(
                &config.output,
                config.fps,
                size,
            )?));
        }
    }
    #[cfg(not(feature = "opencv"))]
    let _ = size;

    let dir = config.png_output_dir();
    debug!("writing PNG frames at nominal {} fps", config.fps);
    Ok(Box::new(crate::video::PngSequenceSink::create(dir)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions() {
        use LoopState::*;
        assert_eq!(Running, Running.on_key(None));
        assert_eq!(Running, Running.on_key(Some(Key::Other('a'))));
        assert_eq!(Paused, Running.on_key(Some(Key::Space)));
        assert_eq!(Stopped, Running.on_key(Some(Key::Escape)));
        assert_eq!(Running, Paused.on_key(Some(Key::Space)));
        assert_eq!(Running, Paused.on_key(Some(Key::Other('x'))));
        assert_eq!(Stopped, Paused.on_key(Some(Key::Escape)));
        assert_eq!(Stopped, Paused.on_key(None));
        assert_eq!(Stopped, Stopped.on_key(Some(Key::Space)));
    }

    #[test]
    fn pacer_spaces_frames_by_the_interval() {
        let mut pacer = Pacer::new(Duration::from_millis(5));
        let start = Instant::now();
        for _ in 0..4 {
            pacer.wait();
        }
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn zero_interval_never_sleeps_long() {
        let mut pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            pacer.wait();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
