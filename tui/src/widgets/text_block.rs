//! TextBlock Widget
//!
//! A borderless, word-wrapped, horizontally centered text region. Used for
//! the help text under the frame and the home screen copy.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

/// A borderless, centered text block
pub struct TextBlock<'a> {
    content: &'a str,
    style: Style,
}

impl<'a> TextBlock<'a> {
    /// Create a block for `content`
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            style: Style::default(),
        }
    }

    /// Set the text style
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Lines after wrapping to `width` columns
    pub fn wrapped(&self, width: u16) -> Vec<String> {
        let width = usize::from(width.max(1));
        self.content
            .lines()
            .flat_map(|line| {
                if line.is_empty() {
                    vec![String::new()]
                } else {
                    wrap(line, width)
                        .into_iter()
                        .map(|cow| cow.to_string())
                        .collect()
                }
            })
            .collect()
    }
}

impl Widget for TextBlock<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        for (i, line) in self
            .wrapped(area.width)
            .iter()
            .take(usize::from(area.height))
            .enumerate()
        {
            let line_width = u16::try_from(line.width()).unwrap_or(area.width).min(area.width);
            let x = area.x + (area.width - line_width) / 2;
            #[allow(clippy::cast_possible_truncation)]
            let y = area.y + i as u16;
            buf.set_stringn(x, y, line, usize::from(area.width), self.style);
        }
    }
}
