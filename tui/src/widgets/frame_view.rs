//! FrameView Widget
//!
//! Draws a rendered overlay frame with half-block characters: each cell
//! shows two vertically stacked pixels, the upper one as the foreground of
//! `▀` and the lower one as the background. Circle labels are printed on
//! top at their scaled positions.

use actionq_core::RenderedFrame;
use image::imageops::{self, FilterType};
use image::Rgba;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::theme::{LABEL_BG, LABEL_FG};

const UPPER_HALF: &str = "▀";

/// Draws a [`RenderedFrame`] into a terminal area
pub struct FrameView<'a> {
    frame: &'a RenderedFrame,
}

impl<'a> FrameView<'a> {
    /// Create a view of `frame`
    pub fn new(frame: &'a RenderedFrame) -> Self {
        Self { frame }
    }
}

/// Largest `(columns, rows)` that fits `area` and keeps the frame's aspect
///
/// A cell is one pixel wide and two pixels tall.
pub fn fit(frame_size: (u32, u32), area: Rect) -> (u16, u16) {
    let (fw, fh) = (f64::from(frame_size.0.max(1)), f64::from(frame_size.1.max(1)));
    let (aw, ah) = (f64::from(area.width), f64::from(area.height) * 2.0);
    let scale = (aw / fw).min(ah / fh);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cols = (fw * scale).floor() as u16;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rows = ((fh * scale) / 2.0).floor() as u16;
    (cols.min(area.width), rows.min(area.height))
}

fn color(px: Rgba<u8>) -> Color {
    Color::Rgb(px.0[0], px.0[1], px.0[2])
}

impl Widget for FrameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (cols, rows) = fit((self.frame.width(), self.frame.height()), area);
        if cols == 0 || rows == 0 {
            return;
        }

        let scaled = imageops::resize(
            &self.frame.image,
            u32::from(cols),
            u32::from(rows) * 2,
            FilterType::Triangle,
        );

        let x0 = area.x + (area.width - cols) / 2;
        let y0 = area.y + (area.height - rows) / 2;

        for row in 0..rows {
            for col in 0..cols {
                let top = *scaled.get_pixel(u32::from(col), u32::from(row) * 2);
                let bottom = *scaled.get_pixel(u32::from(col), u32::from(row) * 2 + 1);
                buf[(x0 + col, y0 + row)]
                    .set_symbol(UPPER_HALF)
                    .set_fg(color(top))
                    .set_bg(color(bottom));
            }
        }

        let label_style = Style::default()
            .fg(LABEL_FG)
            .bg(LABEL_BG)
            .add_modifier(Modifier::BOLD);
        let sx = f32::from(cols) / self.frame.width().max(1) as f32;
        let sy = f32::from(rows) / self.frame.height().max(1) as f32;

        for label in &self.frame.labels {
            let width = u16::try_from(label.text.width()).unwrap_or(cols);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let cx = (label.position.x * sx).round().max(0.0) as u16;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let cy = (label.position.y * sy).round().max(0.0) as u16;
            if cy >= rows {
                continue;
            }
            let x = cx.saturating_sub(width / 2).min(cols.saturating_sub(width));
            buf.set_stringn(
                x0 + x,
                y0 + cy,
                &label.text,
                usize::from(cols - x),
                label_style,
            );
        }
    }
}
