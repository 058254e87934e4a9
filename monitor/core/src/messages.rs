//! Surface Messages
//!
//! Directives sent from the [`Monitor`](crate::monitor::Monitor) to a
//! presentation surface (terminal UI, headless logger, ...).
//!
//! # Design Philosophy
//!
//! The monitor owns every decision: when the home overlay shows, which
//! notification appears, whether a reference clip plays. Surfaces are pure
//! renderers that apply these messages to their display state and never
//! look at the inbound protocol themselves.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::overlay::RenderedFrame;
use crate::session::{ExerciseState, SessionMeta};

/// Messages from the monitor to a surface
#[derive(Clone, Debug)]
pub enum SurfaceMessage {
    // ============================================
    // Session Directives
    // ============================================
    /// Show or hide the home overlay
    HomeVisible {
        /// Whether the home overlay is visible
        visible: bool,
    },

    /// A session started with this metadata
    SessionInfo {
        /// Session metadata
        meta: SessionMeta,
    },

    /// Show a transient notification
    ///
    /// A newer notification replaces the one on screen.
    Notify {
        /// Notification text
        text: String,
        /// How long to keep it on screen
        duration: Duration,
    },

    /// The exercise status line changed
    ExerciseStatus {
        /// The exercise and its status
        exercise: ExerciseState,
    },

    /// The repetition counter changed
    Repetitions {
        /// Repetitions done
        count: u32,
    },

    /// Help text for the current frame
    HelpText {
        /// Text to show; empty clears it
        text: String,
    },

    // ============================================
    // Reference Clip
    // ============================================
    /// Play the reference clip for an exercise, looping until paused
    PlayReference {
        /// Exercise the clip demonstrates
        exercise_id: String,
        /// Clip location
        path: PathBuf,
    },

    /// Pause the reference clip
    PauseReference,

    // ============================================
    // Overlay & Audio
    // ============================================
    /// A new overlay frame replaces the previous one
    Frame {
        /// The rendered overlay
        frame: Arc<RenderedFrame>,
    },

    /// The voice-guidance clip being played changed
    NowPlaying {
        /// Clip name, or `None` when silent
        clip: Option<String>,
    },

    // ============================================
    // Connection
    // ============================================
    /// Connection to the session server changed
    Connection {
        /// New connection state
        state: ConnectionState,
    },
}

/// State of the connection to the session server
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Receiving messages
    Connected,
    /// The stream ended; no reconnect is attempted
    Closed {
        /// Why the stream ended, when known
        reason: Option<String>,
    },
}

impl SurfaceMessage {
    /// Short name for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HomeVisible { .. } => "home_visible",
            Self::SessionInfo { .. } => "session_info",
            Self::Notify { .. } => "notify",
            Self::ExerciseStatus { .. } => "exercise_status",
            Self::Repetitions { .. } => "repetitions",
            Self::HelpText { .. } => "help_text",
            Self::PlayReference { .. } => "play_reference",
            Self::PauseReference => "pause_reference",
            Self::Frame { .. } => "frame",
            Self::NowPlaying { .. } => "now_playing",
            Self::Connection { .. } => "connection",
        }
    }
}
