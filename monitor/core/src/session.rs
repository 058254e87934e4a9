//! Session State Machine
//!
//! Owns the lifecycle of one guided workout: whether a session is active,
//! which exercise is running, the repetition counter and the deferred
//! "next exercise" notification.
//!
//! # Design Philosophy
//!
//! The machine is pure: it never talks to the surface, the renderer or the
//! audio scheduler directly. Each inbound message is applied and the machine
//! returns the [`SessionEffect`]s the caller must carry out. This keeps every
//! transition testable without channels or timers.
//!
//! Illegal transitions (for example `ExerciseEnd` while idle) are reported as
//! [`TransitionError`] and leave the state untouched. The remaining fields of
//! the message (repetitions, start sub-event) are still applied.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{EventKind, InboundMessage, SessionStartInfo};

/// Shown when a session starts
pub const SESSION_STARTED_NOTICE: &str = "🟢 start!";

/// Shown when the session is over
pub const SESSION_FINISHED_NOTICE: &str = "you finished the exercise for today! well done 🎉";

/// Deferred from `ExerciseEnd` to the next `ExerciseStart`
pub const NEXT_EXERCISE_NOTICE: &str = "great! let's go to the next one";

/// Shown on the synthetic "start" sub-event of an update
pub const EXERCISE_START_NOTICE: &str = "exercise start!";

// =============================================================================
// State Types
// =============================================================================

/// Metadata for the active session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Number of exercises announced by the server
    pub exercises_count: usize,
    /// Exercise ids in execution order
    pub exercise_ids: Vec<String>,
    /// Camera resolution `(width, height)`
    pub resolution: Option<(u32, u32)>,
    /// Camera frame rate
    pub frame_rate: Option<f32>,
}

impl From<SessionStartInfo> for SessionMeta {
    fn from(info: SessionStartInfo) -> Self {
        Self {
            exercises_count: info.exercises_count,
            exercise_ids: info.exercise_ids,
            resolution: info.resolution,
            frame_rate: info.frame_rate,
        }
    }
}

/// Status line of the current exercise
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExerciseStatus {
    /// The exercise is being performed
    Started,
    /// The exercise was completed
    Completed,
}

impl fmt::Display for ExerciseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("Exercise started"),
            Self::Completed => f.write_str("Exercise completed."),
        }
    }
}

/// The exercise currently tracked by the session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseState {
    /// Exercise id
    pub exercise_id: String,
    /// Repetitions to reach, when the server announced one
    pub repetitions_target: Option<u32>,
    /// Status line
    pub status: ExerciseStatus,
}

/// Exercise sub-state of an active session
#[derive(Clone, Debug, PartialEq)]
pub enum ExercisePhase {
    /// Session started, no exercise yet
    NoExercise,
    /// An exercise is running
    Running(ExerciseState),
    /// The last exercise ended and the next one has not started
    JustEnded(ExerciseState),
}

/// Top-level session state
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    /// No active session; the home screen is shown
    Idle,
    /// A session is active; the exercise view is shown
    InSession {
        /// Session metadata
        meta: SessionMeta,
        /// Current exercise sub-state
        exercise: ExercisePhase,
    },
}

/// Side effects requested by a transition
///
/// The caller translates these into surface messages and timers.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEffect {
    /// Hide the home overlay
    HideHome,
    /// Show the home overlay
    ShowHome,
    /// Show a transient notification
    Notify(String),
    /// The exercise status line changed
    ExerciseStatus(ExerciseState),
    /// The repetition counter changed
    Repetitions(u32),
    /// Start the reference clip for an exercise after the transition delay
    PlayReference {
        /// Exercise whose reference clip should play
        exercise_id: String,
    },
    /// Pause the reference clip
    PauseReference,
    /// A new session was recorded
    SessionStarted(SessionMeta),
}

/// A lifecycle event that is not legal in the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// A session-scoped event arrived while idle
    #[error("{0} received while no session is active")]
    NoActiveSession(EventKind),

    /// `ExerciseEnd` arrived while no exercise was running
    #[error("ExerciseEnd received while no exercise is running")]
    NoRunningExercise,
}

// =============================================================================
// State Machine
// =============================================================================

/// Session and exercise lifecycle
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    repetitions: u32,
    pending_notification: Option<String>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    /// Create an idle machine
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            repetitions: 0,
            pending_notification: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether a session is active
    #[must_use]
    pub fn in_session(&self) -> bool {
        matches!(self.state, SessionState::InSession { .. })
    }

    /// Current repetition count
    #[must_use]
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    /// Notification waiting for the next exercise
    #[must_use]
    pub fn pending_notification(&self) -> Option<&str> {
        self.pending_notification.as_deref()
    }

    /// Exercise that is running or has just ended
    #[must_use]
    pub fn current_exercise(&self) -> Option<&ExerciseState> {
        match &self.state {
            SessionState::InSession {
                exercise: ExercisePhase::Running(ex) | ExercisePhase::JustEnded(ex),
                ..
            } => Some(ex),
            _ => None,
        }
    }

    /// Id of the exercise that is currently running
    #[must_use]
    pub fn running_exercise_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::InSession {
                exercise: ExercisePhase::Running(ex),
                ..
            } => Some(&ex.exercise_id),
            _ => None,
        }
    }

    /// Apply one message and return the effects to perform
    ///
    /// Lifecycle transitions run first; an illegal transition is logged and
    /// skipped. The repetition counter and the synthetic "start" sub-event
    /// are applied afterwards regardless of the tag.
    pub fn apply(&mut self, msg: &InboundMessage) -> Vec<SessionEffect> {
        let mut effects = match self.transition(msg) {
            Ok(effects) => effects,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring illegal session transition");
                Vec::new()
            }
        };
        effects.extend(self.observe(msg));
        effects
    }

    /// Apply the lifecycle tag of a message
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the tag is not legal in the current
    /// state. The state is unchanged in that case.
    pub fn transition(
        &mut self,
        msg: &InboundMessage,
    ) -> Result<Vec<SessionEffect>, TransitionError> {
        match msg.kind {
            EventKind::SessionStart => Ok(self.start_session(msg)),
            EventKind::SessionEnd => self.end_session(),
            EventKind::ExerciseStart => self.start_exercise(msg),
            EventKind::ExerciseEnd => self.end_exercise(),
            EventKind::ExerciseUpdate | EventKind::FrameOnly => Ok(Vec::new()),
        }
    }

    /// Apply the tag-independent parts of a message
    fn observe(&mut self, msg: &InboundMessage) -> Vec<SessionEffect> {
        let mut effects = Vec::new();

        if let Some(reps) = msg.repetitions {
            self.repetitions = reps;
            effects.push(SessionEffect::Repetitions(reps));
        }

        if msg.kind == EventKind::ExerciseUpdate
            && msg.metadata.as_ref().is_some_and(|m| m.is_start_event())
        {
            effects.push(SessionEffect::Notify(EXERCISE_START_NOTICE.to_string()));
        }

        effects
    }

    fn start_session(&mut self, msg: &InboundMessage) -> Vec<SessionEffect> {
        if self.in_session() {
            tracing::info!("SessionStart while a session is active, restarting");
        }

        let meta = msg.session.clone().map_or_else(
            || SessionMeta {
                exercises_count: 0,
                exercise_ids: Vec::new(),
                resolution: None,
                frame_rate: None,
            },
            SessionMeta::from,
        );

        tracing::info!(
            exercises = meta.exercises_count,
            ids = ?meta.exercise_ids,
            "Session started"
        );

        self.state = SessionState::InSession {
            meta: meta.clone(),
            exercise: ExercisePhase::NoExercise,
        };
        self.pending_notification = None;

        vec![
            SessionEffect::SessionStarted(meta),
            SessionEffect::HideHome,
            SessionEffect::Notify(SESSION_STARTED_NOTICE.to_string()),
        ]
    }

    fn end_session(&mut self) -> Result<Vec<SessionEffect>, TransitionError> {
        if !self.in_session() {
            return Err(TransitionError::NoActiveSession(EventKind::SessionEnd));
        }

        tracing::info!("Session ended");
        self.state = SessionState::Idle;
        if let Some(dropped) = self.pending_notification.take() {
            tracing::debug!(notice = %dropped, "Discarding pending notification");
        }

        Ok(vec![
            SessionEffect::ShowHome,
            SessionEffect::Notify(SESSION_FINISHED_NOTICE.to_string()),
        ])
    }

    fn start_exercise(
        &mut self,
        msg: &InboundMessage,
    ) -> Result<Vec<SessionEffect>, TransitionError> {
        let SessionState::InSession { exercise, .. } = &mut self.state else {
            return Err(TransitionError::NoActiveSession(EventKind::ExerciseStart));
        };

        let exercise_id = msg.exercise_id.clone().unwrap_or_default();
        let state = ExerciseState {
            exercise_id: exercise_id.clone(),
            repetitions_target: msg.repetitions_target,
            status: ExerciseStatus::Started,
        };
        *exercise = ExercisePhase::Running(state.clone());
        self.repetitions = 0;

        tracing::info!(
            exercise_id = %exercise_id,
            repetitions_target = ?state.repetitions_target,
            "Exercise started"
        );

        let mut effects = vec![
            SessionEffect::ExerciseStatus(state),
            SessionEffect::Repetitions(0),
            SessionEffect::PlayReference { exercise_id },
        ];
        if let Some(notice) = self.pending_notification.take() {
            effects.push(SessionEffect::Notify(notice));
        }
        Ok(effects)
    }

    fn end_exercise(&mut self) -> Result<Vec<SessionEffect>, TransitionError> {
        let SessionState::InSession { exercise, .. } = &mut self.state else {
            return Err(TransitionError::NoActiveSession(EventKind::ExerciseEnd));
        };
        let ExercisePhase::Running(running) = &*exercise else {
            return Err(TransitionError::NoRunningExercise);
        };

        let mut ended = running.clone();
        ended.status = ExerciseStatus::Completed;
        tracing::info!(exercise_id = %ended.exercise_id, "Exercise completed");

        *exercise = ExercisePhase::JustEnded(ended.clone());
        self.pending_notification = Some(NEXT_EXERCISE_NOTICE.to_string());

        Ok(vec![
            SessionEffect::ExerciseStatus(ended),
            SessionEffect::PauseReference,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode, Metadata};
    use pretty_assertions::assert_eq;

    fn session_start() -> InboundMessage {
        decode(
            r#"{"type":"SessionStart","exercises_count":3,"exercise_ids":["a","b","c"],"resolution":[640,480],"frame_rate":30}"#,
        )
        .unwrap()
    }

    fn exercise_start(id: &str) -> InboundMessage {
        let mut msg = InboundMessage::empty(EventKind::ExerciseStart);
        msg.exercise_id = Some(id.to_string());
        msg
    }

    fn notices(effects: &[SessionEffect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                SessionEffect::Notify(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_session_start_enters_session() {
        let mut machine = SessionMachine::new();
        let effects = machine.apply(&session_start());

        let SessionState::InSession { meta, exercise } = machine.state() else {
            panic!("expected InSession");
        };
        assert_eq!(meta.exercises_count, 3);
        assert_eq!(meta.exercise_ids, vec!["a", "b", "c"]);
        assert_eq!(meta.resolution, Some((640, 480)));
        assert_eq!(*exercise, ExercisePhase::NoExercise);

        assert!(effects.contains(&SessionEffect::HideHome));
        assert_eq!(notices(&effects), vec![SESSION_STARTED_NOTICE]);
    }

    #[test]
    fn test_exercise_start_resets_repetitions() {
        let mut machine = SessionMachine::new();
        machine.apply(&session_start());

        let mut update = InboundMessage::empty(EventKind::ExerciseUpdate);
        update.repetitions = Some(5);
        machine.apply(&update);
        assert_eq!(machine.repetitions(), 5);

        let effects = machine.apply(&exercise_start("a"));
        assert_eq!(machine.repetitions(), 0);
        assert_eq!(machine.running_exercise_id(), Some("a"));
        assert!(effects.contains(&SessionEffect::PlayReference {
            exercise_id: "a".into()
        }));
        assert!(effects.contains(&SessionEffect::Repetitions(0)));
    }

    #[test]
    fn test_exercise_end_defers_notification() {
        let mut machine = SessionMachine::new();
        machine.apply(&session_start());
        machine.apply(&exercise_start("a"));

        let effects = machine.apply(&InboundMessage::empty(EventKind::ExerciseEnd));
        assert!(notices(&effects).is_empty());
        assert!(effects.contains(&SessionEffect::PauseReference));
        assert_eq!(machine.pending_notification(), Some(NEXT_EXERCISE_NOTICE));
        assert_eq!(
            machine.current_exercise().map(|e| e.status),
            Some(ExerciseStatus::Completed)
        );

        let effects = machine.apply(&exercise_start("b"));
        assert_eq!(notices(&effects), vec![NEXT_EXERCISE_NOTICE]);
        assert_eq!(machine.pending_notification(), None);
    }

    #[test]
    fn test_session_end_discards_pending_notification() {
        let mut machine = SessionMachine::new();
        machine.apply(&session_start());
        machine.apply(&exercise_start("a"));
        machine.apply(&InboundMessage::empty(EventKind::ExerciseEnd));

        let effects = machine.apply(&InboundMessage::empty(EventKind::SessionEnd));
        assert_eq!(machine.state(), &SessionState::Idle);
        assert_eq!(machine.pending_notification(), None);
        assert!(effects.contains(&SessionEffect::ShowHome));
        assert_eq!(notices(&effects), vec![SESSION_FINISHED_NOTICE]);

        // A new session must not resurrect the dropped notice
        machine.apply(&session_start());
        let effects = machine.apply(&exercise_start("a"));
        assert!(notices(&effects).is_empty());
    }

    #[test]
    fn test_session_start_clears_pending_notification() {
        let mut machine = SessionMachine::new();
        machine.apply(&session_start());
        machine.apply(&exercise_start("a"));
        machine.apply(&InboundMessage::empty(EventKind::ExerciseEnd));

        machine.apply(&session_start());
        assert_eq!(machine.pending_notification(), None);
    }

    #[test]
    fn test_update_only_changes_repetitions() {
        let mut machine = SessionMachine::new();
        machine.apply(&session_start());
        machine.apply(&exercise_start("a"));
        let before = machine.state().clone();

        let update = decode(r#"{"type":"ExerciseUpdate","repetitions":7}"#).unwrap();
        let effects = machine.apply(&update);

        assert_eq!(machine.repetitions(), 7);
        assert_eq!(machine.state(), &before);
        assert_eq!(effects, vec![SessionEffect::Repetitions(7)]);
    }

    #[test]
    fn test_repetitions_apply_while_idle() {
        let mut machine = SessionMachine::new();
        let mut frame = InboundMessage::empty(EventKind::FrameOnly);
        frame.repetitions = Some(2);
        machine.apply(&frame);
        assert_eq!(machine.repetitions(), 2);
        assert_eq!(machine.state(), &SessionState::Idle);
    }

    #[test]
    fn test_start_sub_event_notifies() {
        let mut machine = SessionMachine::new();
        machine.apply(&session_start());
        machine.apply(&exercise_start("a"));

        let mut update = InboundMessage::empty(EventKind::ExerciseUpdate);
        update.metadata = Some(Metadata {
            event: Some("start".into()),
            ..Metadata::default()
        });
        let effects = machine.apply(&update);
        assert_eq!(notices(&effects), vec![EXERCISE_START_NOTICE]);
    }

    #[test]
    fn test_illegal_transitions_leave_state_unchanged() {
        let mut machine = SessionMachine::new();

        assert_eq!(
            machine.transition(&InboundMessage::empty(EventKind::ExerciseEnd)),
            Err(TransitionError::NoActiveSession(EventKind::ExerciseEnd))
        );
        assert_eq!(
            machine.transition(&InboundMessage::empty(EventKind::SessionEnd)),
            Err(TransitionError::NoActiveSession(EventKind::SessionEnd))
        );
        assert_eq!(
            machine.transition(&exercise_start("a")),
            Err(TransitionError::NoActiveSession(EventKind::ExerciseStart))
        );
        assert_eq!(machine.state(), &SessionState::Idle);

        machine.apply(&session_start());
        assert_eq!(
            machine.transition(&InboundMessage::empty(EventKind::ExerciseEnd)),
            Err(TransitionError::NoRunningExercise)
        );
        assert_eq!(machine.pending_notification(), None);
    }

    #[test]
    fn test_illegal_transition_still_applies_repetitions() {
        let mut machine = SessionMachine::new();
        let mut msg = InboundMessage::empty(EventKind::ExerciseEnd);
        msg.repetitions = Some(3);

        let effects = machine.apply(&msg);
        assert_eq!(effects, vec![SessionEffect::Repetitions(3)]);
        assert_eq!(machine.state(), &SessionState::Idle);
    }

    #[test]
    fn test_repetitions_on_exercise_start_override_reset() {
        let mut machine = SessionMachine::new();
        machine.apply(&session_start());
        let mut msg = exercise_start("a");
        msg.repetitions = Some(1);
        machine.apply(&msg);
        assert_eq!(machine.repetitions(), 1);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ExerciseStatus::Started.to_string(), "Exercise started");
        assert_eq!(ExerciseStatus::Completed.to_string(), "Exercise completed.");
    }
}
