//! Screen Layout
//!
//! Pure drawing from [`DisplayState`]; no state is changed here.
//!
//! ```text
//! ┌ status ─────────────────────────────────────────────┐
//! │ ┌ frame ───────────────────────────┐ ┌ exercise ──┐ │
//! │ │                                  │ │ squat 1/3  │ │
//! │ │          overlay frame           │ │ reps 4/10  │ │
//! │ │                                  │ │ reference  │ │
//! │ └──────────────────────────────────┘ └────────────┘ │
//! │                 help text                           │
//! └─────────────────────────────────────────────────────┘
//! ```

use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use actionq_core::ExerciseStatus;

use crate::display::{DisplayConnection, DisplayState, ReferenceClip, Toast};
use crate::theme::{
    ACCENT, BORDER, DIM_GRAY, ERROR_RED, HELP_TEXT, HOME_BG, REPETITIONS, STATUS_COMPLETED,
    STATUS_STARTED, SUCCESS_GREEN, TOAST_BG, TOAST_FG,
};
use crate::widgets::{FrameView, TextBlock};

/// Width of the exercise panel
const SIDE_PANEL_WIDTH: u16 = 30;

/// Rows reserved for help text
const HELP_HEIGHT: u16 = 3;

/// Draw the whole screen
pub fn draw(f: &mut Frame, display: &DisplayState, server: &str) {
    let area = f.area();

    if display.home_visible {
        draw_home(f, area, display, server);
    } else {
        draw_session(f, area, display, server);
    }

    if let Some(toast) = &display.toast {
        draw_toast(f, area, toast);
    }
}

fn connection_span(connection: &DisplayConnection) -> Span<'static> {
    match connection {
        DisplayConnection::Connecting => {
            Span::styled("○ connecting", Style::default().fg(DIM_GRAY))
        }
        DisplayConnection::Connected => {
            Span::styled("● connected", Style::default().fg(SUCCESS_GREEN))
        }
        DisplayConnection::Closed(None) => {
            Span::styled("● stream ended", Style::default().fg(DIM_GRAY))
        }
        DisplayConnection::Closed(Some(reason)) => Span::styled(
            format!("● disconnected: {reason}"),
            Style::default().fg(ERROR_RED),
        ),
    }
}

// ============================================================================
// Home
// ============================================================================

fn draw_home(f: &mut Frame, area: Rect, display: &DisplayState, server: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(HOME_BG));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from(Span::styled(
            "ActionQ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Waiting for a session to start"),
        Line::from(Span::styled(server.to_string(), Style::default().fg(DIM_GRAY))),
        Line::from(""),
        Line::from(connection_span(&display.connection)),
        Line::from(""),
        Line::from(Span::styled("q to quit", Style::default().fg(DIM_GRAY))),
    ];

    #[allow(clippy::cast_possible_truncation)]
    let height = (lines.len() as u16).min(inner.height);
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(inner);

    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), middle);
}

// ============================================================================
// Session
// ============================================================================

fn draw_session(f: &mut Frame, area: Rect, display: &DisplayState, server: &str) {
    let [status, body, help] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(HELP_HEIGHT),
    ])
    .areas(area);

    let status_line = Line::from(vec![
        connection_span(&display.connection),
        Span::styled(format!("  {server}"), Style::default().fg(DIM_GRAY)),
    ]);
    f.render_widget(Paragraph::new(status_line), status);

    let [frame_area, side] =
        Layout::horizontal([Constraint::Min(20), Constraint::Length(SIDE_PANEL_WIDTH)])
            .areas(body);

    let frame_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));
    let frame_inner = frame_block.inner(frame_area);
    f.render_widget(frame_block, frame_area);
    match &display.frame {
        Some(frame) => f.render_widget(FrameView::new(frame), frame_inner),
        None => f.render_widget(
            TextBlock::new("waiting for frames").style(Style::default().fg(DIM_GRAY)),
            center_row(frame_inner),
        ),
    }

    draw_side_panel(f, side, display);

    f.render_widget(
        TextBlock::new(&display.help_text).style(Style::default().fg(HELP_TEXT)),
        help,
    );
}

fn draw_side_panel(f: &mut Frame, area: Rect, display: &DisplayState) {
    let block = Block::default()
        .title(" Exercise ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));

    let mut lines = Vec::new();

    match &display.exercise {
        Some(exercise) => {
            let mut title = vec![Span::styled(
                exercise.exercise_id.clone(),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            )];
            if let Some((index, count)) = display.exercise_position() {
                title.push(Span::styled(
                    format!("  {index}/{count}"),
                    Style::default().fg(DIM_GRAY),
                ));
            }
            lines.push(Line::from(title));

            let color = match exercise.status {
                ExerciseStatus::Started => STATUS_STARTED,
                ExerciseStatus::Completed => STATUS_COMPLETED,
            };
            lines.push(Line::from(Span::styled(
                exercise.status.to_string(),
                Style::default().fg(color),
            )));
        }
        None => lines.push(Line::from(Span::styled(
            "no exercise yet",
            Style::default().fg(DIM_GRAY),
        ))),
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Repetitions",
        Style::default().fg(DIM_GRAY),
    )));
    lines.push(Line::from(Span::styled(
        display.repetitions_label(),
        Style::default().fg(REPETITIONS).add_modifier(Modifier::BOLD),
    )));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Reference", Style::default().fg(DIM_GRAY))));
    lines.push(Line::from(match &display.reference {
        ReferenceClip::None => "-".to_string(),
        ReferenceClip::Playing {
            exercise_id,
            looping: true,
            ..
        } => format!("▶ {exercise_id} (loop)"),
        ReferenceClip::Playing { exercise_id, .. } => format!("▶ {exercise_id}"),
        ReferenceClip::Paused { exercise_id } => format!("⏸ {exercise_id}"),
    }));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Voice", Style::default().fg(DIM_GRAY))));
    lines.push(Line::from(
        display
            .now_playing
            .as_deref()
            .map_or_else(|| "-".to_string(), |clip| format!("♪ {clip}")),
    ));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn center_row(area: Rect) -> Rect {
    let [_, row, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(area);
    row
}

// ============================================================================
// Toast
// ============================================================================

fn draw_toast(f: &mut Frame, area: Rect, toast: &Toast) {
    let text_width = u16::try_from(toast.text.width()).unwrap_or(u16::MAX);
    let width = text_width.saturating_add(4).min(area.width);
    let height = 3.min(area.height);
    let toast_area = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + 1.min(area.height - height),
        width,
        height,
    );

    let style = Style::default()
        .fg(TOAST_FG)
        .bg(TOAST_BG)
        .add_modifier(Modifier::BOLD);
    f.render_widget(Clear, toast_area);
    f.render_widget(
        Paragraph::new(toast.text.as_str())
            .alignment(Alignment::Center)
            .style(style)
            .block(Block::default().borders(Borders::ALL).style(style)),
        toast_area,
    );
}
