//! Overlay Renderer
//!
//! Turns one inbound frame into an RGBA image ready for a surface: the
//! decoded camera image scaled to the surface size, the skeleton edges and
//! keypoints, then the server's widgets.
//!
//! # Design Philosophy
//!
//! Every render starts from a fresh buffer, so nothing from a previous frame
//! can survive into the next one. Rendering is CPU work with no I/O and runs
//! on a blocking thread, off the monitor loop.
//!
//! Text is not rasterized here. Circle labels are returned as
//! [`OverlayLabel`]s and each surface prints them with its own text
//! facilities.

pub mod draw;
pub mod skeleton;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{Point, Skeleton, Widget};

use self::draw::{BLACK, GREEN, ORANGE, PURPLE, WHITE};
pub use self::skeleton::SKELETON_EDGES;

/// Default surface width
pub const DEFAULT_WIDTH: u32 = 640;
/// Default surface height
pub const DEFAULT_HEIGHT: u32 = 480;

const EDGE_WIDTH: f32 = 1.0;
const KEYPOINT_RADIUS: f32 = 4.0;
const KEYPOINT_GLOW: f32 = 6.0;
const KEYPOINT_GLOW_ALPHA: f32 = 0.8;
const CIRCLE_RADIUS: f32 = 15.0;
const SEGMENT_WIDTH: f32 = 3.0;
const GUIDE_WIDTH: f32 = 2.0;
const ARC_WIDTH: f32 = 3.0;

/// A frame could not be turned into an image
#[derive(Debug, Error)]
pub enum FrameError {
    /// The message carried no image bytes
    #[error("frame is empty")]
    Empty,

    /// The bytes are not a decodable image
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
}

/// Text the surface should print on top of the frame
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayLabel {
    /// Center of the text in surface pixels
    pub position: Point,
    /// The text
    pub text: String,
}

/// A fully drawn overlay
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    /// Surface-sized RGBA image
    pub image: RgbaImage,
    /// Labels to print centered on their positions
    pub labels: Vec<OverlayLabel>,
}

impl RenderedFrame {
    /// Surface width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Surface height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode JPEG (or any format `image` recognizes) frame bytes
///
/// # Errors
///
/// Returns [`FrameError`] when the bytes are empty or not an image.
pub fn decode_frame(bytes: &[u8]) -> Result<DynamicImage, FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::Empty);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Draws frames at a fixed surface size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayRenderer {
    width: u32,
    height: u32,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl OverlayRenderer {
    /// Create a renderer for a `width` x `height` surface
    ///
    /// Zero dimensions are clamped to one pixel.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Surface size as `(width, height)`
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decode frame bytes and render them
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the frame cannot be decoded.
    pub fn render_bytes(
        &self,
        frame: &[u8],
        skeleton: &Skeleton,
        widgets: &[Widget],
    ) -> Result<RenderedFrame, FrameError> {
        let image = decode_frame(frame)?;
        Ok(self.render(&image, skeleton, widgets))
    }

    /// Render an image with its skeleton and widgets
    ///
    /// Skeleton and widget coordinates are in source image pixels and are
    /// scaled with the image.
    #[must_use]
    pub fn render(
        &self,
        image: &DynamicImage,
        skeleton: &Skeleton,
        widgets: &[Widget],
    ) -> RenderedFrame {
        let mut canvas = imageops::resize(
            &image.to_rgba8(),
            self.width,
            self.height,
            FilterType::Triangle,
        );
        let scale = Scale::between(image.width(), image.height(), self.width, self.height);

        draw_skeleton(&mut canvas, skeleton, scale);
        let labels = widgets
            .iter()
            .filter_map(|widget| draw_widget(&mut canvas, widget, scale))
            .collect();

        RenderedFrame {
            image: canvas,
            labels,
        }
    }
}

/// Source-to-surface coordinate mapping
#[derive(Clone, Copy, Debug)]
struct Scale {
    x: f32,
    y: f32,
}

impl Scale {
    #[allow(clippy::cast_precision_loss)]
    fn between(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Self {
        Self {
            x: dst_w as f32 / src_w.max(1) as f32,
            y: dst_h as f32 / src_h.max(1) as f32,
        }
    }

    fn point(self, p: Point) -> Point {
        Point::new(p.x * self.x, p.y * self.y)
    }

    /// Radii scale with the mean factor so circles stay round
    fn length(self, r: f32) -> f32 {
        r * (self.x + self.y) / 2.0
    }
}

fn draw_skeleton(canvas: &mut RgbaImage, skeleton: &Skeleton, scale: Scale) {
    for (a, b) in SKELETON_EDGES {
        if let (Some(from), Some(to)) = (skeleton.get(a), skeleton.get(b)) {
            draw::thick_line(canvas, scale.point(from), scale.point(to), EDGE_WIDTH, WHITE);
        }
    }

    for (_, point) in skeleton.iter() {
        draw::glowing_dot(
            canvas,
            scale.point(point),
            KEYPOINT_RADIUS,
            KEYPOINT_GLOW,
            WHITE,
            KEYPOINT_GLOW_ALPHA,
        );
    }
}

fn draw_widget(canvas: &mut RgbaImage, widget: &Widget, scale: Scale) -> Option<OverlayLabel> {
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);

    match widget {
        Widget::Circle { position, label } => {
            let center = scale.point(*position);
            if !draw::touches(canvas, center, CIRCLE_RADIUS) {
                return None;
            }
            draw::filled_circle(canvas, center, CIRCLE_RADIUS, WHITE);
            draw::circle_outline(canvas, center, CIRCLE_RADIUS, BLACK);
            (!label.is_empty()).then(|| OverlayLabel {
                position: center,
                text: label.clone(),
            })
        }
        Widget::Segment { from, to } => {
            draw::thick_line(
                canvas,
                scale.point(*from),
                scale.point(*to),
                SEGMENT_WIDTH,
                ORANGE,
            );
            None
        }
        Widget::HLine { y } => {
            let y = y * scale.y;
            draw::thick_line(canvas, Point::new(0.0, y), Point::new(w, y), GUIDE_WIDTH, GREEN);
            None
        }
        Widget::VLine { x } => {
            let x = x * scale.x;
            draw::thick_line(canvas, Point::new(x, 0.0), Point::new(x, h), GUIDE_WIDTH, GREEN);
            None
        }
        Widget::Arc {
            center,
            radius,
            from,
            to,
        } => {
            let points =
                draw::arc_points(scale.point(*center), scale.length(*radius), *from, *to);
            for pair in points.windows(2) {
                draw::thick_line(canvas, pair[0], pair[1], ARC_WIDTH, PURPLE);
            }
            None
        }
    }
}
