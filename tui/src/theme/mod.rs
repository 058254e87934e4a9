//! Theme and Colors
//!
//! The monitor palette. Overlay colors themselves come from the rendered
//! frame; these only style the chrome around it.

use ratatui::style::Color;

// ============================================================================
// Brand
// ============================================================================

/// Titles and the active exercise
pub const ACCENT: Color = Color::Rgb(120, 230, 160);

/// Panel borders
pub const BORDER: Color = Color::Rgb(90, 110, 100);

/// Home screen background tint
pub const HOME_BG: Color = Color::Rgb(14, 22, 18);

// ============================================================================
// Exercise Status
// ============================================================================

/// Exercise in progress
pub const STATUS_STARTED: Color = Color::Rgb(255, 200, 90);

/// Exercise completed
pub const STATUS_COMPLETED: Color = Color::Rgb(120, 230, 120);

/// Repetition counter
pub const REPETITIONS: Color = Color::Rgb(255, 255, 255);

// ============================================================================
// Notifications & Labels
// ============================================================================

/// Toast foreground
pub const TOAST_FG: Color = Color::Rgb(20, 20, 20);

/// Toast background
pub const TOAST_BG: Color = Color::Rgb(120, 230, 160);

/// Circle widget label text (drawn on the white disc)
pub const LABEL_FG: Color = Color::Rgb(0, 0, 0);

/// Circle widget label background
pub const LABEL_BG: Color = Color::Rgb(255, 255, 255);

// ============================================================================
// UI Colors
// ============================================================================

/// Secondary text
pub const DIM_GRAY: Color = Color::Rgb(110, 110, 110);

/// Help text under the frame
pub const HELP_TEXT: Color = Color::Rgb(200, 220, 255);

/// Connection errors
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Connected indicator
pub const SUCCESS_GREEN: Color = Color::Rgb(120, 230, 120);
