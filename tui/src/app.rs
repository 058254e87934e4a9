//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, resize)
//! - `MonitorClient` for the session monitor
//! - `DisplayState` for rendering
//!
//! Each frame the App:
//! 1. Handles terminal events
//! 2. Receives `SurfaceMessage`s and updates `DisplayState`
//! 3. Expires notifications
//! 4. Renders based on `DisplayState`

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::Terminal;

use crate::display::DisplayState;
use crate::monitor_client::MonitorClient;
use crate::ui;

/// Target frame interval (~30 FPS, enough for a camera feed)
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Main application state
pub struct App {
    /// Is the app still running?
    running: bool,
    /// Client for the background monitor
    monitor: MonitorClient,
    /// Display state derived from `SurfaceMessage`s
    display: DisplayState,
    /// Server shown in the status line
    server: String,
}

impl App {
    /// Create an App around a running monitor
    pub fn new(monitor: MonitorClient, server: impl Into<String>) -> Self {
        Self {
            running: true,
            monitor,
            display: DisplayState::new(),
            server: server.into(),
        }
    }

    /// Current display state
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Main event loop
    ///
    /// Returns when the user quits, or with the monitor's error if it stopped
    /// with one. A stream that simply ends keeps the UI up showing that.
    ///
    /// # Errors
    ///
    /// Terminal I/O failures and monitor errors.
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();

        // Render initial frame immediately so user sees UI
        self.render(terminal)?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.handle_key(key);
                        }
                        Some(Ok(Event::Resize(_, _))) => terminal.autoresize()?,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => tracing::warn!("Terminal event error: {}", e),
                        None => self.running = false,
                    }
                }

                // Frame tick
                () = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            self.process_monitor_messages();
            self.display.update(Instant::now());

            if let Some(outcome) = self.monitor.poll_exit().await {
                // Pick up anything sent right before the monitor stopped
                self.process_monitor_messages();
                outcome?;
                tracing::info!("Monitor finished");
            }

            self.render(terminal)?;

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < FRAME_DURATION {
                tokio::time::sleep(FRAME_DURATION - elapsed).await;
            }
        }

        Ok(())
    }

    /// Process all pending messages from the monitor
    fn process_monitor_messages(&mut self) {
        for msg in self.monitor.recv_all() {
            self.display.apply_message(msg);
        }
    }

    /// Handle keyboard input
    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.running = false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false;
            }
            _ => {}
        }
    }

    fn render<B: Backend>(&self, terminal: &mut Terminal<B>) -> io::Result<()> {
        terminal.draw(|f| ui::draw(f, &self.display, &self.server))?;
        Ok(())
    }
}
