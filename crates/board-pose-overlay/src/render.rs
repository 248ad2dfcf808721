use crate::canvas::{Canvas, PixelPoint};
use crate::shape::ArShape;
use board_pose_geometry::{BoardPose, Camera};
use image::Rgb;
use log::trace;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Colors and placement of the overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    pub lower: Rgb<u8>,
    pub upper: Rgb<u8>,
    pub vertical: Rgb<u8>,
    pub text: Rgb<u8>,
    pub thickness: u32,
    /// Baseline-left corner of the position text.
    pub text_origin: PixelPoint,
    pub text_scale: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            lower: Rgb([0, 0, 255]),
            upper: Rgb([255, 0, 0]),
            vertical: Rgb([0, 255, 0]),
            text: Rgb([0, 255, 0]),
            thickness: 2,
            text_origin: PixelPoint::new(10, 25),
            text_scale: 2,
        }
    }
}

/// Draw consecutive segments; `closed` adds the last -> first edge.
///
/// Segments touching a `None` vertex are skipped.
pub fn draw_polyline<C: Canvas + ?Sized>(
    canvas: &mut C,
    points: &[Option<PixelPoint>],
    closed: bool,
    color: Rgb<u8>,
    thickness: u32,
) {
    let n = points.len();
    if n < 2 {
        return;
    }
    let edges = if closed { n } else { n - 1 };
    for i in 0..edges {
        if let (Some(a), Some(b)) = (points[i], points[(i + 1) % n]) {
            canvas.draw_line(a, b, color, thickness);
        }
    }
}

fn to_pixels(points: &[Point2<f64>]) -> Vec<Option<PixelPoint>> {
    points.iter().map(|&p| PixelPoint::from_projected(p)).collect()
}

/// Project `shape` with `pose` and draw it, then the camera position text.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn render_overlay<C: Canvas + ?Sized>(
    canvas: &mut C,
    camera: &Camera,
    pose: &BoardPose,
    shape: &ArShape,
    style: &OverlayStyle,
) {
    let lower = to_pixels(&camera.project_points(&shape.lower, pose));
    let upper = to_pixels(&camera.project_points(&shape.upper, pose));
    let hidden = lower.iter().chain(&upper).filter(|p| p.is_none()).count();
    if hidden > 0 {
        trace!("{hidden} overlay vertices did not project to finite pixels");
    }

    draw_polyline(canvas, &lower, true, style.lower, style.thickness);
    draw_polyline(canvas, &upper, true, style.upper, style.thickness);
    for (lo, up) in lower.iter().zip(&upper) {
        if let (Some(a), Some(b)) = (lo, up) {
            canvas.draw_line(*a, *b, style.vertical, style.thickness);
        }
    }

    let text = pose.camera_position().to_string();
    canvas.draw_text(&text, style.text_origin, style.text, style.text_scale);
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_pose_geometry::{BrownConrady, CameraIntrinsics};
    use image::RgbImage;
    use nalgebra::Vector3;

    #[derive(Default)]
    struct RecordingCanvas {
        lines: Vec<(PixelPoint, PixelPoint, Rgb<u8>, u32)>,
        texts: Vec<(String, PixelPoint, Rgb<u8>)>,
    }

    impl Canvas for RecordingCanvas {
        fn draw_line(&mut self, p0: PixelPoint, p1: PixelPoint, color: Rgb<u8>, thickness: u32) {
            self.lines.push((p0, p1, color, thickness));
        }

        fn draw_text(&mut self, text: &str, origin: PixelPoint, color: Rgb<u8>, _scale: u32) {
            self.texts.push((text.to_owned(), origin, color));
        }
    }

    fn camera() -> Camera {
        Camera::new(
            CameraIntrinsics::new(800.0, 800.0, 320.0, 240.0),
            BrownConrady::default(),
        )
    }

    fn pose() -> BoardPose {
        BoardPose::new(Vector3::new(0.2, -0.1, 0.05), Vector3::new(-0.08, -0.07, 0.5))
    }

    #[test]
    fn closed_polyline_has_one_edge_per_vertex() {
        let pts: Vec<Option<PixelPoint>> =
            (0..12).map(|i| Some(PixelPoint::new(i * 10, i))).collect();
        let mut canvas = RecordingCanvas::default();
        draw_polyline(&mut canvas, &pts, true, Rgb([0, 0, 255]), 2);

        assert_eq!(12, canvas.lines.len());
        for (i, (a, b, _, _)) in canvas.lines.iter().enumerate() {
            assert_eq!(pts[i].as_ref(), Some(a));
            assert_eq!(pts[(i + 1) % 12].as_ref(), Some(b));
        }
        let (a, b, _, _) = canvas.lines[11];
        assert_eq!((PixelPoint::new(110, 11), PixelPoint::new(0, 0)), (a, b));
    }

    #[test]
    fn open_polyline_skips_missing_vertices() {
        let pts = [
            Some(PixelPoint::new(0, 0)),
            None,
            Some(PixelPoint::new(5, 5)),
            Some(PixelPoint::new(9, 1)),
        ];
        let mut canvas = RecordingCanvas::default();
        draw_polyline(&mut canvas, &pts, false, Rgb([1, 2, 3]), 1);
        assert_eq!(1, canvas.lines.len());
    }

    #[test]
    fn overlay_draws_rings_verticals_and_text() {
        let (camera, pose, style) = (camera(), pose(), OverlayStyle::default());
        let shape = ArShape::h_prism(0.028);
        let mut canvas = RecordingCanvas::default();
        render_overlay(&mut canvas, &camera, &pose, &shape, &style);

        assert_eq!(36, canvas.lines.len());
        let by_color = |c: Rgb<u8>| canvas.lines.iter().filter(|l| l.2 == c).count();
        assert_eq!(12, by_color(style.lower));
        assert_eq!(12, by_color(style.upper));
        assert_eq!(12, by_color(style.vertical));
        assert!(canvas.lines.iter().all(|l| l.3 == 2));

        let lower = to_pixels(&camera.project_points(&shape.lower, &pose));
        let upper = to_pixels(&camera.project_points(&shape.upper, &pose));
        let verticals: Vec<_> = canvas.lines.iter().filter(|l| l.2 == style.vertical).collect();
        for (i, (a, b, _, _)) in verticals.iter().enumerate() {
            assert_eq!(lower[i], Some(*a));
            assert_eq!(upper[i], Some(*b));
        }

        assert_eq!(1, canvas.texts.len());
        let (text, origin, color) = &canvas.texts[0];
        assert_eq!(&pose.camera_position().to_string(), text);
        assert!(text.starts_with("XYZ: ["));
        assert_eq!(PixelPoint::new(10, 25), *origin);
        assert_eq!(style.text, *color);
    }

    #[test]
    fn overlay_paints_the_image() {
        let mut img = RgbImage::new(640, 480);
        render_overlay(
            &mut img,
            &camera(),
            &pose(),
            &ArShape::h_prism(0.028),
            &OverlayStyle::default(),
        );
        let blue = img.pixels().filter(|p| p.0 == [0, 0, 255]).count();
        let red = img.pixels().filter(|p| p.0 == [255, 0, 0]).count();
        assert!(blue > 0 && red > 0);
    }
}
