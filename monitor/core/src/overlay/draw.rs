//! Drawing primitives on top of `imageproc`
//!
//! `imageproc` draws opaque one-pixel shapes. Stroke width and the
//! translucent keypoint glow are built here.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};

use crate::protocol::Point;

/// Opaque white
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// Opaque black
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Segment widgets
pub const ORANGE: Rgba<u8> = Rgba([255, 165, 0, 255]);
/// Guide line widgets
pub const GREEN: Rgba<u8> = Rgba([0, 128, 0, 255]);
/// Arc widgets
pub const PURPLE: Rgba<u8> = Rgba([128, 0, 128, 255]);

/// Clip the segment `from`-`to` to the rectangle `min`-`max` (Liang-Barsky)
///
/// Returns `None` when the segment lies entirely outside or an endpoint is
/// not finite. Computed in `f64` so endpoints near `f32::MAX` cannot
/// overflow; results are clamped to the rectangle since precision at that
/// magnitude is far coarser than a pixel.
#[must_use]
pub fn clip_segment(from: Point, to: Point, min: Point, max: Point) -> Option<(Point, Point)> {
    if ![from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite()) {
        return None;
    }

    let (x0, y0) = (f64::from(from.x), f64::from(from.y));
    let (dx, dy) = (f64::from(to.x) - x0, f64::from(to.y) - y0);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

    for (p, q) in [
        (-dx, x0 - f64::from(min.x)),
        (dx, f64::from(max.x) - x0),
        (-dy, y0 - f64::from(min.y)),
        (dy, f64::from(max.y) - y0),
    ] {
        if p.abs() < f64::EPSILON {
            // Parallel to this edge
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let at = |t: f64| {
        Point::new(
            ((x0 + t * dx) as f32).clamp(min.x, max.x),
            ((y0 + t * dy) as f32).clamp(min.y, max.y),
        )
    };
    Some((at(t0), at(t1)))
}

/// Draw a line `width` pixels wide
///
/// Built from parallel one-pixel lines spaced half a pixel apart along the
/// normal, which leaves no gaps on diagonals. The line is clipped to the
/// image first, so far off-canvas endpoints cost nothing.
pub fn thick_line(img: &mut RgbaImage, from: Point, to: Point, width: f32, color: Rgba<u8>) {
    let margin = width.max(1.0) + 1.0;
    #[allow(clippy::cast_precision_loss)]
    let max = Point::new(img.width() as f32 + margin, img.height() as f32 + margin);
    let Some((from, to)) = clip_segment(from, to, Point::new(-margin, -margin), max) else {
        return;
    };

    if width <= 1.0 {
        draw_line_segment_mut(img, (from.x, from.y), (to.x, to.y), color);
        return;
    }

    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let len = dx.hypot(dy);
    let (nx, ny) = if len > f32::EPSILON {
        (-dy / len, dx / len)
    } else {
        (0.0, 1.0)
    };

    let half = (width - 1.0) / 2.0;
    let mut offset = -half;
    while offset <= half + f32::EPSILON {
        let (ox, oy) = (nx * offset, ny * offset);
        draw_line_segment_mut(
            img,
            (from.x + ox, from.y + oy),
            (to.x + ox, to.y + oy),
            color,
        );
        offset += 0.5;
    }
}

/// Whether a shape of `reach` pixels around `center` can touch the image
#[must_use]
pub fn touches(img: &RgbaImage, center: Point, reach: f32) -> bool {
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (img.width() as f32, img.height() as f32);
    center.x.is_finite()
        && center.y.is_finite()
        && center.x >= -reach
        && center.y >= -reach
        && center.x <= w + reach
        && center.y <= h + reach
}

/// Blend `color` over the pixel at `(x, y)` with the given opacity
///
/// Coordinates outside the image are ignored.
pub fn blend_pixel(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, alpha: f32) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if x >= img.width() || y >= img.height() {
        return;
    }

    let alpha = alpha.clamp(0.0, 1.0);
    let pixel = img.get_pixel_mut(x, y);
    for channel in 0..3 {
        let base = f32::from(pixel.0[channel]);
        let over = f32::from(color.0[channel]);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mixed = (base + (over - base) * alpha).round() as u8;
        pixel.0[channel] = mixed;
    }
    pixel.0[3] = 255;
}

/// Filled dot with a soft halo fading out over `glow` pixels
///
/// The halo starts at `max_alpha` opacity on the dot's rim and fades
/// linearly to transparent.
pub fn glowing_dot(
    img: &mut RgbaImage,
    center: Point,
    radius: f32,
    glow: f32,
    color: Rgba<u8>,
    max_alpha: f32,
) {
    let outer = radius + glow;
    if !touches(img, center, outer) {
        return;
    }
    #[allow(clippy::cast_possible_truncation)]
    let (x0, x1, y0, y1) = (
        (center.x - outer).floor() as i64,
        (center.x + outer).ceil() as i64,
        (center.y - outer).floor() as i64,
        (center.y + outer).ceil() as i64,
    );

    for y in y0..=y1 {
        for x in x0..=x1 {
            #[allow(clippy::cast_precision_loss)]
            let d = (x as f32 - center.x).hypot(y as f32 - center.y);
            if d > radius && d <= outer {
                let fade = 1.0 - (d - radius) / glow;
                blend_pixel(img, x, y, color, max_alpha * fade);
            }
        }
    }

    filled_circle(img, center, radius, color);
}

/// Opaque filled circle
pub fn filled_circle(img: &mut RgbaImage, center: Point, radius: f32, color: Rgba<u8>) {
    if !touches(img, center, radius) {
        return;
    }
    draw_filled_circle_mut(img, to_pixel(center), round_radius(radius), color);
}

/// Opaque one-pixel circle outline
pub fn circle_outline(img: &mut RgbaImage, center: Point, radius: f32, color: Rgba<u8>) {
    if !touches(img, center, radius) {
        return;
    }
    draw_hollow_circle_mut(img, to_pixel(center), round_radius(radius), color);
}

/// Sample points along an arc
///
/// Angles are in degrees, counter-clockwise from the positive x axis with
/// the y axis pointing up, so screen y is `center.y - r * sin`. When `to`
/// is less than `from` the arc runs clockwise. The span wraps at 360.
#[must_use]
pub fn arc_points(center: Point, radius: f32, from: f32, to: f32) -> Vec<Point> {
    let span = (to - from).abs() % 360.0;
    let direction = if to < from { -1.0 } else { 1.0 };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = ((span / 5.0).ceil() as usize).max(5);
    #[allow(clippy::cast_precision_loss)]
    let step = span / steps as f32;

    (0..=steps)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let angle = (from + direction * step * i as f32).to_radians();
            Point::new(
                center.x + radius * angle.cos(),
                center.y - radius * angle.sin(),
            )
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn to_pixel(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

#[allow(clippy::cast_possible_truncation)]
fn round_radius(r: f32) -> i32 {
    r.round().max(0.0) as i32
}
