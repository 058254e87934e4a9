//! Display State Types
//!
//! Types that represent the current display state for the TUI.
//! These are derived from `SurfaceMessage`s and used for rendering.
//!
//! # Design Philosophy
//!
//! The TUI is a "thin client" - it just renders what the monitor tells it to.
//! Display state is the bridge between `SurfaceMessage`s and rendering; the
//! only thing it decides on its own is when a notification has been on
//! screen long enough.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actionq_core::{
    ConnectionState, ExerciseState, ExerciseStatus, RenderedFrame, SessionMeta, SurfaceMessage,
};

/// A notification on screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    /// Text to show
    pub text: String,
    /// When it appeared
    pub shown_at: Instant,
    /// How long it stays
    pub duration: Duration,
}

impl Toast {
    /// Whether the toast should be gone at `now`
    pub fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= self.duration
    }
}

/// Reference clip panel state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferenceClip {
    /// Nothing loaded
    None,
    /// Playing; loops while the exercise is running
    Playing {
        /// Exercise the clip demonstrates
        exercise_id: String,
        /// Clip file
        path: PathBuf,
        /// Restart at the end of the clip
        looping: bool,
    },
    /// Paused at the end of an exercise
    Paused {
        /// Exercise the clip demonstrates
        exercise_id: String,
    },
}

/// Connection indicator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayConnection {
    /// Waiting for the first connection
    Connecting,
    /// Receiving
    Connected,
    /// Stream over
    Closed(Option<String>),
}

impl From<ConnectionState> for DisplayConnection {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => Self::Connected,
            ConnectionState::Closed { reason } => Self::Closed(reason),
        }
    }
}

/// Complete display state
#[derive(Clone, Debug)]
pub struct DisplayState {
    /// Whether the home overlay covers the exercise view
    pub home_visible: bool,
    /// Current session, if one started
    pub session: Option<SessionMeta>,
    /// Exercise shown in the status panel
    pub exercise: Option<ExerciseState>,
    /// Repetitions done
    pub repetitions: u32,
    /// Help text under the frame
    pub help_text: String,
    /// Notification on screen
    pub toast: Option<Toast>,
    /// Reference clip panel
    pub reference: ReferenceClip,
    /// Latest overlay frame
    pub frame: Option<Arc<RenderedFrame>>,
    /// Voice-guidance clip playing
    pub now_playing: Option<String>,
    /// Connection indicator
    pub connection: DisplayConnection,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            home_visible: true,
            session: None,
            exercise: None,
            repetitions: 0,
            help_text: String::new(),
            toast: None,
            reference: ReferenceClip::None,
            frame: None,
            now_playing: None,
            connection: DisplayConnection::Connecting,
        }
    }
}

impl DisplayState {
    /// Create the initial display state (home screen, connecting)
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a monitor message to update display state
    pub fn apply_message(&mut self, msg: SurfaceMessage) {
        self.apply_message_at(msg, Instant::now());
    }

    /// Apply a monitor message received at `now`
    pub fn apply_message_at(&mut self, msg: SurfaceMessage, now: Instant) {
        match msg {
            SurfaceMessage::HomeVisible { visible } => {
                self.home_visible = visible;
                if visible {
                    self.reference = ReferenceClip::None;
                    self.now_playing = None;
                }
            }
            SurfaceMessage::SessionInfo { meta } => {
                self.session = Some(meta);
                self.exercise = None;
                self.repetitions = 0;
            }
            SurfaceMessage::Notify { text, duration } => {
                // Newer toast replaces the current one
                self.toast = Some(Toast {
                    text,
                    shown_at: now,
                    duration,
                });
            }
            SurfaceMessage::ExerciseStatus { exercise } => {
                if exercise.status == ExerciseStatus::Completed {
                    if let ReferenceClip::Playing { looping, .. } = &mut self.reference {
                        *looping = false;
                    }
                }
                self.exercise = Some(exercise);
            }
            SurfaceMessage::Repetitions { count } => self.repetitions = count,
            SurfaceMessage::HelpText { text } => self.help_text = text,
            SurfaceMessage::PlayReference { exercise_id, path } => {
                let looping = self
                    .exercise
                    .as_ref()
                    .map_or(true, |ex| ex.status == ExerciseStatus::Started);
                self.reference = ReferenceClip::Playing {
                    exercise_id,
                    path,
                    looping,
                };
            }
            SurfaceMessage::PauseReference => {
                let exercise_id = match &self.reference {
                    ReferenceClip::Playing { exercise_id, .. }
                    | ReferenceClip::Paused { exercise_id } => Some(exercise_id.clone()),
                    ReferenceClip::None => {
                        self.exercise.as_ref().map(|ex| ex.exercise_id.clone())
                    }
                };
                self.reference =
                    exercise_id.map_or(ReferenceClip::None, |exercise_id| ReferenceClip::Paused {
                        exercise_id,
                    });
            }
            SurfaceMessage::Frame { frame } => self.frame = Some(frame),
            SurfaceMessage::NowPlaying { clip } => self.now_playing = clip,
            SurfaceMessage::Connection { state } => self.connection = state.into(),
        }
    }

    /// Update timers, clearing an expired notification
    pub fn update(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|t| t.expired(now)) {
            self.toast = None;
        }
    }

    /// Repetition counter text, `reps / target` when a target is known
    pub fn repetitions_label(&self) -> String {
        match self.exercise.as_ref().and_then(|ex| ex.repetitions_target) {
            Some(target) => format!("{} / {}", self.repetitions, target),
            None => self.repetitions.to_string(),
        }
    }

    /// Position of the current exercise in the session, 1-based
    pub fn exercise_position(&self) -> Option<(usize, usize)> {
        let session = self.session.as_ref()?;
        let exercise = self.exercise.as_ref()?;
        let index = session
            .exercise_ids
            .iter()
            .position(|id| *id == exercise.exercise_id)?;
        Some((index + 1, session.exercises_count.max(session.exercise_ids.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn exercise(id: &str, target: Option<u32>, status: ExerciseStatus) -> ExerciseState {
        ExerciseState {
            exercise_id: id.to_string(),
            repetitions_target: target,
            status,
        }
    }

    #[test]
    fn test_initial_state_shows_home() {
        let state = DisplayState::new();
        assert!(state.home_visible);
        assert_eq!(state.connection, DisplayConnection::Connecting);
        assert_eq!(state.reference, ReferenceClip::None);
    }

    #[test]
    fn test_toast_expires_after_duration() {
        let mut state = DisplayState::new();
        let t0 = Instant::now();
        state.apply_message_at(
            SurfaceMessage::Notify {
                text: "exercise start!".to_string(),
                duration: Duration::from_millis(2000),
            },
            t0,
        );

        state.update(t0 + Duration::from_millis(1999));
        assert!(state.toast.is_some());
        state.update(t0 + Duration::from_millis(2000));
        assert!(state.toast.is_none());
    }

    #[test]
    fn test_newer_toast_replaces_current() {
        let mut state = DisplayState::new();
        let t0 = Instant::now();
        let notify = |text: &str| SurfaceMessage::Notify {
            text: text.to_string(),
            duration: Duration::from_millis(2000),
        };
        state.apply_message_at(notify("first"), t0);
        state.apply_message_at(notify("second"), t0 + Duration::from_millis(1500));

        state.update(t0 + Duration::from_millis(2500));
        let toast = state.toast.as_ref().unwrap();
        assert_eq!(toast.text, "second");
    }

    #[test]
    fn test_reference_stops_looping_when_completed() {
        let mut state = DisplayState::new();
        state.apply_message(SurfaceMessage::ExerciseStatus {
            exercise: exercise("squat", None, ExerciseStatus::Started),
        });
        state.apply_message(SurfaceMessage::PlayReference {
            exercise_id: "squat".to_string(),
            path: PathBuf::from("exercises1/squat/reference.mp4"),
        });
        assert!(matches!(
            state.reference,
            ReferenceClip::Playing { looping: true, .. }
        ));

        state.apply_message(SurfaceMessage::ExerciseStatus {
            exercise: exercise("squat", None, ExerciseStatus::Completed),
        });
        assert!(matches!(
            state.reference,
            ReferenceClip::Playing { looping: false, .. }
        ));

        state.apply_message(SurfaceMessage::PauseReference);
        assert_eq!(
            state.reference,
            ReferenceClip::Paused {
                exercise_id: "squat".to_string()
            }
        );
    }

    #[test]
    fn test_repetitions_label_with_target() {
        let mut state = DisplayState::new();
        state.apply_message(SurfaceMessage::Repetitions { count: 3 });
        assert_eq!(state.repetitions_label(), "3");

        state.apply_message(SurfaceMessage::ExerciseStatus {
            exercise: exercise("squat", Some(12), ExerciseStatus::Started),
        });
        assert_eq!(state.repetitions_label(), "3 / 12");
    }

    #[test]
    fn test_exercise_position() {
        let mut state = DisplayState::new();
        state.apply_message(SurfaceMessage::SessionInfo {
            meta: SessionMeta {
                exercises_count: 3,
                exercise_ids: vec!["squat".into(), "lunge".into(), "plank".into()],
                resolution: None,
                frame_rate: None,
            },
        });
        state.apply_message(SurfaceMessage::ExerciseStatus {
            exercise: exercise("lunge", None, ExerciseStatus::Started),
        });
        assert_eq!(state.exercise_position(), Some((2, 3)));
    }

    #[test]
    fn test_home_clears_reference_and_audio() {
        let mut state = DisplayState::new();
        state.apply_message(SurfaceMessage::NowPlaying {
            clip: Some("down.mp3".to_string()),
        });
        state.apply_message(SurfaceMessage::PlayReference {
            exercise_id: "squat".to_string(),
            path: PathBuf::from("exercises1/squat/reference.mp4"),
        });

        state.apply_message(SurfaceMessage::HomeVisible { visible: true });
        assert_eq!(state.reference, ReferenceClip::None);
        assert_eq!(state.now_playing, None);
    }

    #[test]
    fn test_connection_closed_reason() {
        let mut state = DisplayState::new();
        state.apply_message(SurfaceMessage::Connection {
            state: ConnectionState::Closed {
                reason: Some("Connection reset".to_string()),
            },
        });
        assert_eq!(
            state.connection,
            DisplayConnection::Closed(Some("Connection reset".to_string()))
        );
    }
}
