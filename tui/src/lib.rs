//! ActionQ TUI - Terminal surface for the session monitor
//!
//! This crate renders what the monitor in `actionq-core` decides: the home
//! screen, the annotated overlay frame, exercise status and notifications.
//!
//! # Architecture
//!
//! - **`MonitorClient`**: Runs the monitor task and receives its messages
//! - **`DisplayState`**: Screen state derived from `SurfaceMessage`s
//! - **`ui`**: Pure drawing from `DisplayState`
//! - **Widgets**: Half-block frame view and wrapped text

pub mod app;
pub mod display;
pub mod monitor_client;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::App;
pub use display::DisplayState;
pub use monitor_client::MonitorClient;
