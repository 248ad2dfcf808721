//! OpenCV-backed video file input, `mp4v` output and a highgui window.

use super::{FrameDisplay, FrameSink, FrameSource, VideoError};
use crate::keys::{Key, KeyEvents};
use image::{Rgb, RgbImage};
use log::{info, warn};
use opencv::{
    core::{self, Mat, Scalar, Size},
    highgui,
    prelude::*,
    videoio,
};

/// BGR `Mat` to an RGB image.
fn mat_to_rgb(mat: &Mat) -> opencv::Result<RgbImage> {
    let (rows, cols) = (mat.rows(), mat.cols());
    let mut img = RgbImage::new(cols as u32, rows as u32);
    for r in 0..rows {
        for c in 0..cols {
            let [b, g, red] = mat.at_2d::<core::Vec3b>(r, c)?.0;
            img.put_pixel(c as u32, r as u32, Rgb([red, g, b]));
        }
    }
    Ok(img)
}

/// RGB image to a BGR `Mat`.
fn rgb_to_mat(img: &RgbImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        img.height() as i32,
        img.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    for (x, y, px) in img.enumerate_pixels() {
        let [r, g, b] = px.0;
        mat.at_2d_mut::<core::Vec3b>(y as i32, x as i32)?.0 = [b, g, r];
    }
    Ok(mat)
}

/// Frames decoded by `VideoCapture`.
pub struct CaptureSource {
    cap: videoio::VideoCapture,
    size: Option<(u32, u32)>,
}

impl CaptureSource {
    pub fn open(path: &str) -> Result<Self, VideoError> {
        let open_err = || VideoError::OpenInput(path.to_owned());
        let cap = videoio::VideoCapture::from_file(path, videoio::CAP_ANY).map_err(|_| open_err())?;
        if !videoio::VideoCapture::is_opened(&cap).unwrap_or(false) {
            return Err(open_err());
        }

        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
        let size = (width > 0.0 && height > 0.0).then_some((width as u32, height as u32));
        info!("opened {path} ({width}x{height})");
        Ok(Self { cap, size })
    }
}

impl FrameSource for CaptureSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        let mut frame = Mat::default();
        match self.cap.read(&mut frame) {
            Ok(true) if frame.rows() > 0 => match mat_to_rgb(&frame) {
                Ok(img) => Some(img),
                Err(err) => {
                    warn!("cannot convert frame: {err}; ending stream");
                    None
                }
            },
            Ok(_) => None,
            Err(err) => {
                warn!("read failed: {err}; ending stream");
                None
            }
        }
    }

    fn frame_size(&self) -> Option<(u32, u32)> {
        self.size
    }
}

/// `mp4v` video at a fixed frame rate and the input frame size.
pub struct VideoFileSink {
    writer: videoio::VideoWriter,
    written: usize,
}

impl VideoFileSink {
    pub fn create(path: &str, fps: f64, (width, height): (u32, u32)) -> Result<Self, VideoError> {
        let open_err = || VideoError::OpenOutput(path.to_owned());
        let fourcc = videoio::VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = videoio::VideoWriter::new(
            path,
            fourcc,
            fps,
            Size::new(width as i32, height as i32),
            true,
        )
        .map_err(|_| open_err())?;
        // Without a usable encoder every write would be silently dropped.
        if !writer.is_opened().unwrap_or(false) {
            return Err(open_err());
        }
        info!("writing {width}x{height} mp4v at {fps} fps to {path}");
        Ok(Self { writer, written: 0 })
    }
}

impl FrameSink for VideoFileSink {
    fn write(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        self.writer.write(&rgb_to_mat(frame)?)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        self.writer.release()?;
        info!("wrote {} frames", self.written);
        Ok(())
    }
}

/// A named highgui window.
pub struct HighguiWindow {
    title: String,
}

impl HighguiWindow {
    pub fn open(title: &str) -> Result<Self, VideoError> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            title: title.to_owned(),
        })
    }
}

impl FrameDisplay for HighguiWindow {
    fn show(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        highgui::imshow(&self.title, &rgb_to_mat(frame)?)?;
        Ok(())
    }
}

impl Drop for HighguiWindow {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.title);
    }
}

/// Key events of the highgui windows.
///
/// `poll` also pumps the window event loop, so it must run once per frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct HighguiKeys;

impl KeyEvents for HighguiKeys {
    fn poll(&mut self) -> Option<Key> {
        highgui::wait_key(1).ok().and_then(Key::from_code)
    }

    fn wait(&mut self) -> Option<Key> {
        highgui::wait_key(0).ok().and_then(Key::from_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_video_path_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("out.mp4");
        let err = VideoFileSink::create(path.to_str().expect("utf8"), 30.0, (64, 48))
            .err()
            .expect("cannot open");
        assert!(matches!(err, VideoError::OpenOutput(p) if p.ends_with("out.mp4")));
    }
}
