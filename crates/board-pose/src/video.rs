//! Frame sources, sinks and display surfaces.
//!
//! The default backends work on plain image files: a directory of frames in,
//! a PNG sequence out, no window. The `opencv` feature adds video files and a
//! highgui window.

use image::RgbImage;
use log::{info, warn};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "opencv")]
pub mod opencv;

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("Cannot read the given input, {0}")]
    OpenInput(String),
    #[error("cannot open output video {0}")]
    OpenOutput(String),
    #[error("failed to write frame {index} to {path}: {source}")]
    WriteFrame {
        index: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "opencv")]
    #[error(transparent)]
    OpenCv(#[from] ::opencv::Error),
}

/// A stream of frames. `None` ends the stream, read failures included.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<RgbImage>;

    /// Frame size if known before the first read.
    fn frame_size(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Receives every frame of the run, annotated or not.
pub trait FrameSink {
    fn write(&mut self, frame: &RgbImage) -> Result<(), VideoError>;

    /// Finalize the output; called once after the last frame.
    fn finish(&mut self) -> Result<(), VideoError> {
        Ok(())
    }
}

/// Shows the current frame to the user.
pub trait FrameDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<(), VideoError>;
}

const FRAME_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Image files of a directory, read in file-name order.
pub struct ImageSequenceSource {
    frames: VecDeque<PathBuf>,
    size: Option<(u32, u32)>,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, VideoError> {
        let dir = dir.as_ref();
        let open_err = || VideoError::OpenInput(dir.display().to_string());

        let entries = fs::read_dir(dir).map_err(|_| open_err())?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            })
            .collect();
        if frames.is_empty() {
            return Err(open_err());
        }
        frames.sort();

        let size = image::image_dimensions(&frames[0]).map_err(|_| open_err())?;
        info!("reading {} frames from {}", frames.len(), dir.display());
        Ok(Self {
            frames: frames.into(),
            size: Some(size),
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        let path = self.frames.pop_front()?;
        match image::open(&path) {
            Ok(img) => Some(img.to_rgb8()),
            Err(err) => {
                warn!("cannot decode {}: {err}; ending stream", path.display());
                self.frames.clear();
                None
            }
        }
    }

    fn frame_size(&self) -> Option<(u32, u32)> {
        self.size
    }
}

/// In-memory frames, useful for embedding and tests.
#[derive(Default)]
pub struct MemorySource {
    frames: VecDeque<RgbImage>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        self.frames.pop_front()
    }

    fn frame_size(&self) -> Option<(u32, u32)> {
        self.frames.front().map(|f| f.dimensions())
    }
}

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
pub struct PngSequenceSink {
    dir: PathBuf,
    written: usize,
}

impl PngSequenceSink {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, VideoError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, written: 0 })
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl FrameSink for PngSequenceSink {
    fn write(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        let path = self.frame_path(self.written);
        frame.save(&path).map_err(|source| VideoError::WriteFrame {
            index: self.written,
            path,
            source,
        })?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        info!("wrote {} frames to {}", self.written, self.dir.display());
        Ok(())
    }
}

/// Keeps every written frame in memory.
#[derive(Default)]
pub struct MemorySink {
    pub frames: Vec<RgbImage>,
    pub finished: bool,
}

impl FrameSink for MemorySink {
    fn write(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        self.finished = true;
        Ok(())
    }
}

/// Display that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl FrameDisplay for Headless {
    fn show(&mut self, _frame: &RgbImage) -> Result<(), VideoError> {
        Ok(())
    }
}

/// Open `input` with the best available backend.
///
/// Directories are read as image sequences; other paths need the `opencv`
/// feature. Any failure is reported as [`VideoError::OpenInput`].
pub fn open_source(input: &str) -> Result<Box<dyn FrameSource>, VideoError> {
    if Path::new(input).is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(input)?));
    }
    #[cfg(feature = "opencv")]
    {
        Ok(Box::new(opencv::CaptureSource::open(input)?))
    }
    #[cfg(not(feature = "opencv"))]
    {
        Err(VideoError::OpenInput(input.to_owned()))
    }
}
