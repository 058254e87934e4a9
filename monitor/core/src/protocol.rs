//! Inbound Session Protocol
//!
//! Decodes the JSON payloads streamed by the pose-tracking server into typed
//! [`InboundMessage`] values.
//!
//! # Design Philosophy
//!
//! Every field of a payload is independent: a lifecycle message such as
//! `ExerciseStart` may also carry a frame, a skeleton and metadata, and all of
//! them must be applied. The decoder therefore never treats fields as
//! mutually exclusive; it only rejects payloads that are structurally broken
//! (malformed JSON, unknown `type`, missing required lifecycle fields).
//!
//! Widgets are the exception to "fail fast": the server may add new widget
//! kinds or send partially-populated ones, and losing a whole frame because of
//! one decorative shape is worse than skipping that shape. Widgets are decoded
//! one at a time and bad entries are dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that reject an inbound payload
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON or a field has the wrong shape
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is valid JSON but not an object
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// The `type` field names an event this client does not know
    #[error("unknown event type: {0}")]
    UnknownType(String),

    /// A lifecycle event is missing a field it cannot work without
    #[error("{kind} is missing required field `{field}`")]
    MissingField {
        /// Event that was being decoded
        kind: EventKind,
        /// Name of the absent field
        field: &'static str,
    },

    /// `repetitions` was negative, fractional or not finite
    #[error("invalid repetition count: {0}")]
    InvalidRepetitions(f64),
}

// =============================================================================
// Geometry
// =============================================================================

/// A 2D point in frame pixel coordinates
///
/// Serialized as a two-element array `[x, y]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate (grows downwards)
    pub y: f32,
}

impl Point {
    /// Create a point
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Named keypoints detected in one frame
///
/// Keys are COCO keypoint names (`"left_shoulder"`, `"nose"`, ...). A
/// keypoint the detector did not see is simply absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skeleton(BTreeMap<String, Point>);

impl Skeleton {
    /// Create an empty skeleton
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a keypoint
    pub fn insert(&mut self, name: impl Into<String>, point: Point) {
        self.0.insert(name.into(), point);
    }

    /// Look up a keypoint by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Point> {
        self.0.get(name).copied()
    }

    /// Iterate over all present keypoints
    pub fn iter(&self) -> impl Iterator<Item = (&str, Point)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of present keypoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no keypoint was detected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Point)> for Skeleton {
    fn from_iter<I: IntoIterator<Item = (S, Point)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A drawable annotation sent by the server for one frame
///
/// Externally tagged on the wire, e.g. `{"HLine": {"y": 120.0}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Widget {
    /// Labeled disc, typically a counter bubble
    Circle {
        /// Disc center
        position: Point,
        /// Text printed on the disc
        #[serde(alias = "text", default)]
        label: String,
    },
    /// Straight colored line between two points
    Segment {
        /// Start point
        from: Point,
        /// End point
        to: Point,
    },
    /// Horizontal guide spanning the whole frame
    HLine {
        /// Vertical position of the guide
        y: f32,
    },
    /// Vertical guide spanning the whole frame
    VLine {
        /// Horizontal position of the guide
        x: f32,
    },
    /// Partial circle between two angles
    Arc {
        /// Arc center
        center: Point,
        /// Arc radius in pixels
        radius: f32,
        /// Start angle in degrees, counter-clockwise from the positive x axis
        from: f32,
        /// End angle in degrees
        to: f32,
    },
}

// =============================================================================
// Messages
// =============================================================================

/// Lifecycle tag of an inbound message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A session begins
    SessionStart,
    /// The session is over
    SessionEnd,
    /// An exercise begins
    ExerciseStart,
    /// The running exercise is over
    ExerciseEnd,
    /// Progress inside the running exercise
    ExerciseUpdate,
    /// No `type` field: a plain streaming frame
    FrameOnly,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::ExerciseStart => "ExerciseStart",
            Self::ExerciseEnd => "ExerciseEnd",
            Self::ExerciseUpdate => "ExerciseUpdate",
            Self::FrameOnly => "frame",
        };
        f.write_str(name)
    }
}

impl FromStr for EventKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SessionStart" => Ok(Self::SessionStart),
            "SessionEnd" => Ok(Self::SessionEnd),
            "ExerciseStart" => Ok(Self::ExerciseStart),
            "ExerciseEnd" => Ok(Self::ExerciseEnd),
            "ExerciseUpdate" => Ok(Self::ExerciseUpdate),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }
}

/// Per-frame instructions attached by the server
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// Help text to show under the video
    pub help: Option<String>,
    /// Voice-guidance clip filename
    pub audio: Option<String>,
    /// Synthetic sub-event (`"start"` marks the beginning of counting)
    pub event: Option<String>,
    /// Exercise the clip belongs to, when the message itself carries none
    pub exercise_id: Option<String>,
    /// Shapes to draw over the frame
    pub widgets: Vec<Widget>,
}

impl Metadata {
    /// Whether the metadata marks the synthetic "start" sub-event
    #[must_use]
    pub fn is_start_event(&self) -> bool {
        self.event.as_deref() == Some("start")
    }
}

/// Session description carried by `SessionStart`
#[derive(Clone, Debug, PartialEq)]
pub struct SessionStartInfo {
    /// Number of exercises in the session
    pub exercises_count: usize,
    /// Exercise ids in execution order
    pub exercise_ids: Vec<String>,
    /// Camera resolution as `(width, height)`
    pub resolution: Option<(u32, u32)>,
    /// Camera frame rate
    pub frame_rate: Option<f32>,
}

/// One decoded inbound message
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    /// Lifecycle tag
    pub kind: EventKind,
    /// Exercise this message refers to
    pub exercise_id: Option<String>,
    /// Repetitions performed so far
    pub repetitions: Option<u32>,
    /// Repetitions to reach (only on `ExerciseStart`)
    pub repetitions_target: Option<u32>,
    /// JPEG-encoded frame; empty when the message carries no image
    pub frame: Vec<u8>,
    /// Keypoints for the frame
    pub skeleton: Skeleton,
    /// Per-frame instructions
    pub metadata: Option<Metadata>,
    /// Session description (only on `SessionStart`)
    pub session: Option<SessionStartInfo>,
}

impl InboundMessage {
    /// A message with the given tag and nothing else
    #[must_use]
    pub fn empty(kind: EventKind) -> Self {
        Self {
            kind,
            exercise_id: None,
            repetitions: None,
            repetitions_target: None,
            frame: Vec::new(),
            skeleton: Skeleton::new(),
            metadata: None,
            session: None,
        }
    }

    /// Whether the message carries an image to repaint
    #[must_use]
    pub fn has_frame(&self) -> bool {
        !self.frame.is_empty()
    }

    /// Voice-guidance clip named by the metadata, if any
    #[must_use]
    pub fn audio_clip(&self) -> Option<&str> {
        self.metadata.as_ref()?.audio.as_deref()
    }

    /// Help text named by the metadata, if any
    #[must_use]
    pub fn help_text(&self) -> Option<&str> {
        self.metadata.as_ref()?.help.as_deref()
    }

    /// Widgets to draw with this message's frame
    #[must_use]
    pub fn widgets(&self) -> &[Widget] {
        self.metadata.as_ref().map_or(&[], |m| m.widgets.as_slice())
    }

    /// Exercise that owns this message's audio clip
    ///
    /// The message's own `exercise_id` wins over the metadata's.
    #[must_use]
    pub fn audio_scope(&self) -> Option<&str> {
        self.exercise_id
            .as_deref()
            .or_else(|| self.metadata.as_ref()?.exercise_id.as_deref())
    }
}

// =============================================================================
// Wire Format
// =============================================================================

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    exercise_id: Option<String>,
    repetitions: Option<f64>,
    frame: Option<Vec<u8>>,
    skeleton: Option<Skeleton>,
    metadata: Option<RawMetadata>,
    exercises_count: Option<serde_json::Value>,
    exercise_ids: Option<Vec<String>>,
    resolution: Option<serde_json::Value>,
    frame_rate: Option<serde_json::Value>,
    repetitions_target: Option<u32>,
}

#[derive(Deserialize)]
struct RawMetadata {
    help: Option<String>,
    audio: Option<String>,
    event: Option<String>,
    exercise_id: Option<String>,
    widgets: Option<Vec<serde_json::Value>>,
}

impl From<RawMetadata> for Metadata {
    fn from(raw: RawMetadata) -> Self {
        let widgets = raw
            .widgets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Widget>(value) {
                Ok(widget) => Some(widget),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unrecognized widget");
                    None
                }
            })
            .collect();

        Self {
            help: raw.help,
            audio: raw.audio.filter(|a| !a.is_empty()),
            event: raw.event,
            exercise_id: raw.exercise_id,
            widgets,
        }
    }
}

impl TryFrom<RawMessage> for InboundMessage {
    type Error = DecodeError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        let kind = match raw.kind.as_deref() {
            None => EventKind::FrameOnly,
            Some(tag) => tag.parse()?,
        };

        let repetitions = raw.repetitions.map(parse_repetitions).transpose()?;

        let session = (kind == EventKind::SessionStart).then(|| {
            let exercise_ids = raw.exercise_ids.unwrap_or_default();
            SessionStartInfo {
                exercises_count: raw
                    .exercises_count
                    .and_then(|v| lenient_count(&v, "exercises_count"))
                    .map_or(exercise_ids.len(), |n| n as usize),
                exercise_ids,
                resolution: raw.resolution.and_then(|v| lenient_resolution(&v)),
                frame_rate: raw.frame_rate.and_then(|v| lenient_frame_rate(&v)),
            }
        });

        if kind == EventKind::ExerciseStart && raw.exercise_id.is_none() {
            return Err(DecodeError::MissingField {
                kind,
                field: "exercise_id",
            });
        }

        Ok(Self {
            kind,
            exercise_id: raw.exercise_id,
            repetitions,
            repetitions_target: raw.repetitions_target,
            frame: raw.frame.unwrap_or_default(),
            skeleton: raw.skeleton.unwrap_or_default(),
            metadata: raw.metadata.map(Metadata::from),
            session,
        })
    }
}

fn parse_repetitions(value: f64) -> Result<u32, DecodeError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = value as u32;
        Ok(count)
    } else {
        Err(DecodeError::InvalidRepetitions(value))
    }
}

// SessionStart descriptive fields never reject the message: a value of the
// wrong shape is logged and treated as absent.

fn whole_number(v: &serde_json::Value) -> Option<u32> {
    let n = v.as_f64()?;
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX)).then(|| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = n as u32;
        n
    })
}

fn lenient_count(v: &serde_json::Value, field: &'static str) -> Option<u32> {
    let n = whole_number(v);
    if n.is_none() {
        tracing::debug!(field, value = %v, "Ignoring invalid session field");
    }
    n
}

fn lenient_resolution(v: &serde_json::Value) -> Option<(u32, u32)> {
    let size = match v.as_array().map(Vec::as_slice) {
        Some([w, h]) => whole_number(w).zip(whole_number(h)),
        _ => None,
    };
    if size.is_none() {
        tracing::debug!(value = %v, "Ignoring invalid session resolution");
    }
    size
}

fn lenient_frame_rate(v: &serde_json::Value) -> Option<f32> {
    match v.as_f64() {
        #[allow(clippy::cast_possible_truncation)]
        Some(rate) if rate.is_finite() && rate > 0.0 => Some(rate as f32),
        _ => {
            tracing::debug!(value = %v, "Ignoring invalid session frame rate");
            None
        }
    }
}

/// Decode one inbound payload
///
/// Accepts the raw bytes of a text or binary WebSocket frame.
///
/// # Errors
///
/// Returns [`DecodeError`] when the payload is not a JSON object, names an
/// unknown event, lacks a required lifecycle field or carries out-of-range
/// values. Unrecognized widgets are skipped, not reported.
pub fn decode(payload: impl AsRef<[u8]>) -> Result<InboundMessage, DecodeError> {
    let bytes = payload.as_ref();
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => {}
        Some(_) => return Err(DecodeError::NotAnObject),
        None => {
            // Let serde produce the "EOF while parsing" error
        }
    }
    let raw: RawMessage = serde_json::from_slice(bytes)?;
    InboundMessage::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_session_start() {
        let msg = decode(
            r#"{"type":"SessionStart","exercises_count":3,"exercise_ids":["a","b","c"],"resolution":[640,480],"frame_rate":30}"#,
        )
        .unwrap();

        assert_eq!(msg.kind, EventKind::SessionStart);
        assert_eq!(
            msg.session,
            Some(SessionStartInfo {
                exercises_count: 3,
                exercise_ids: vec!["a".into(), "b".into(), "c".into()],
                resolution: Some((640, 480)),
                frame_rate: Some(30.0),
            })
        );
        assert!(!msg.has_frame());
    }

    #[test]
    fn test_session_start_count_defaults_to_ids() {
        let msg = decode(r#"{"type":"SessionStart","exercise_ids":["x","y"]}"#).unwrap();
        assert_eq!(msg.session.unwrap().exercises_count, 2);
    }

    #[test]
    fn test_bare_session_start_accepted() {
        let msg = decode(r#"{"type":"SessionStart"}"#).unwrap();
        assert_eq!(
            msg.session,
            Some(SessionStartInfo {
                exercises_count: 0,
                exercise_ids: Vec::new(),
                resolution: None,
                frame_rate: None,
            })
        );

        let msg = decode(r#"{"type":"SessionStart","exercises_count":2}"#).unwrap();
        let session = msg.session.unwrap();
        assert_eq!(session.exercises_count, 2);
        assert!(session.exercise_ids.is_empty());
    }

    #[test]
    fn test_session_start_accepts_float_numbers() {
        let msg = decode(
            r#"{"type":"SessionStart","exercises_count":3.0,"exercise_ids":["a"],
                "resolution":[640.0,480.0],"frame_rate":29.97}"#,
        )
        .unwrap();
        let session = msg.session.unwrap();
        assert_eq!(session.exercises_count, 3);
        assert_eq!(session.resolution, Some((640, 480)));
        assert_eq!(session.frame_rate, Some(29.97));
    }

    #[test]
    fn test_invalid_session_fields_do_not_drop_message() {
        let msg = decode(
            r#"{"type":"SessionStart","exercises_count":"three","exercise_ids":["a","b"],
                "resolution":[640],"frame_rate":-5}"#,
        )
        .unwrap();
        let session = msg.session.unwrap();
        assert_eq!(session.exercises_count, 2);
        assert_eq!(session.resolution, None);
        assert_eq!(session.frame_rate, None);
    }

    #[test]
    fn test_exercise_start_requires_id() {
        let err = decode(r#"{"type":"ExerciseStart"}"#).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingField {
                field: "exercise_id",
                ..
            }
        ));
    }

    #[test]
    fn test_frame_only_message() {
        let msg = decode(
            r#"{"frame":[255,216,255],"skeleton":{"nose":[1.5,2]},"repetitions":4}"#,
        )
        .unwrap();

        assert_eq!(msg.kind, EventKind::FrameOnly);
        assert_eq!(msg.frame, vec![255, 216, 255]);
        assert_eq!(msg.skeleton.get("nose"), Some(Point::new(1.5, 2.0)));
        assert_eq!(msg.repetitions, Some(4));
    }

    #[test]
    fn test_lifecycle_and_frame_fields_are_independent() {
        let msg = decode(
            r#"{"type":"ExerciseStart","exercise_id":"squat","repetitions_target":10,
                "frame":[1,2],"metadata":{"help":"stand straight","audio":"intro.mp3"}}"#,
        )
        .unwrap();

        assert_eq!(msg.kind, EventKind::ExerciseStart);
        assert_eq!(msg.exercise_id.as_deref(), Some("squat"));
        assert_eq!(msg.repetitions_target, Some(10));
        assert!(msg.has_frame());
        assert_eq!(msg.help_text(), Some("stand straight"));
        assert_eq!(msg.audio_clip(), Some("intro.mp3"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = decode(r#"{"type":"Dance"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(t) if t == "Dance"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(decode("{not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode(""), Err(DecodeError::Json(_))));
        assert!(matches!(decode("[1,2,3]"), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_frame_byte_out_of_range_rejected() {
        assert!(matches!(decode(r#"{"frame":[256]}"#), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_invalid_repetitions_rejected() {
        assert!(matches!(
            decode(r#"{"repetitions":-1}"#),
            Err(DecodeError::InvalidRepetitions(_))
        ));
        assert!(matches!(
            decode(r#"{"repetitions":2.5}"#),
            Err(DecodeError::InvalidRepetitions(_))
        ));
        assert_eq!(decode(r#"{"repetitions":7.0}"#).unwrap().repetitions, Some(7));
    }

    #[test]
    fn test_null_fields_are_absent() {
        let msg = decode(r#"{"frame":null,"skeleton":null,"metadata":null,"exercise_id":null}"#)
            .unwrap();
        assert!(!msg.has_frame());
        assert!(msg.skeleton.is_empty());
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn test_widgets_decode_all_variants() {
        let msg = decode(
            r#"{"metadata":{"widgets":[
                {"Circle":{"position":[10,20],"text":"3"}},
                {"Segment":{"from":[0,0],"to":[5,5]}},
                {"HLine":{"y":100}},
                {"VLine":{"x":50}},
                {"Arc":{"center":[30,30],"radius":12,"from":0,"to":90}}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(
            msg.widgets(),
            &[
                Widget::Circle {
                    position: Point::new(10.0, 20.0),
                    label: "3".into()
                },
                Widget::Segment {
                    from: Point::new(0.0, 0.0),
                    to: Point::new(5.0, 5.0)
                },
                Widget::HLine { y: 100.0 },
                Widget::VLine { x: 50.0 },
                Widget::Arc {
                    center: Point::new(30.0, 30.0),
                    radius: 12.0,
                    from: 0.0,
                    to: 90.0
                },
            ]
        );
    }

    #[test]
    fn test_bad_widgets_are_skipped() {
        let msg = decode(
            r#"{"metadata":{"widgets":[
                {"Triangle":{"a":[0,0]}},
                {"Segment":{"from":[0,0]}},
                "garbage",
                {"VLine":{"x":5}}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(msg.widgets(), &[Widget::VLine { x: 5.0 }]);
    }

    #[test]
    fn test_audio_scope_prefers_message_id() {
        let msg = decode(r#"{"exercise_id":"a","metadata":{"exercise_id":"b","audio":"x.mp3"}}"#)
            .unwrap();
        assert_eq!(msg.audio_scope(), Some("a"));

        let msg = decode(r#"{"metadata":{"exercise_id":"b","audio":"x.mp3"}}"#).unwrap();
        assert_eq!(msg.audio_scope(), Some("b"));

        let msg = decode(r#"{"metadata":{"audio":"x.mp3"}}"#).unwrap();
        assert_eq!(msg.audio_scope(), None);
    }

    #[test]
    fn test_empty_audio_name_is_no_clip() {
        let msg = decode(r#"{"metadata":{"audio":""}}"#).unwrap();
        assert_eq!(msg.audio_clip(), None);
    }

    #[test]
    fn test_start_sub_event() {
        let msg = decode(r#"{"type":"ExerciseUpdate","metadata":{"event":"start"}}"#).unwrap();
        assert!(msg.metadata.unwrap().is_start_event());
    }
}
