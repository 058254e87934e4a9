//! End-to-end tests for the Monitor event loop
//!
//! Each test drives a real [`Monitor`] through an [`InProcessTransport`] and
//! checks the [`SurfaceMessage`]s a surface would receive.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actionq_core::audio::{AudioOutput, ClipPlayer, PlaybackError, PlaybackEvent, PlaybackId};
use actionq_core::session::{
    ExerciseStatus, NEXT_EXERCISE_NOTICE, SESSION_FINISHED_NOTICE, SESSION_STARTED_NOTICE,
};
use actionq_core::{
    ConnectionState, InProcessTransport, Monitor, MonitorConfig, MonitorError, SurfaceMessage,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ============================================================================
// Harness
// ============================================================================

/// Records every clip it is asked to play; completion is driven by the test
#[derive(Clone, Default)]
struct RecordingPlayer {
    plays: Arc<Mutex<Vec<(PlaybackId, PathBuf)>>>,
}

impl ClipPlayer for RecordingPlayer {
    fn play(&mut self, id: PlaybackId, path: &Path) -> Result<(), PlaybackError> {
        self.plays.lock().unwrap().push((id, path.to_path_buf()));
        Ok(())
    }
}

struct Harness {
    feed: mpsc::Sender<Vec<u8>>,
    surface: mpsc::Receiver<SurfaceMessage>,
    playback: mpsc::UnboundedSender<PlaybackEvent>,
    plays: Arc<Mutex<Vec<(PlaybackId, PathBuf)>>>,
    task: JoinHandle<Result<(), MonitorError>>,
}

impl Harness {
    fn start() -> Self {
        let (transport, feed) = InProcessTransport::new_pair();
        let (playback, events) = mpsc::unbounded_channel();
        let player = RecordingPlayer::default();
        let plays = Arc::clone(&player.plays);
        let (tx, surface) = mpsc::channel(64);

        let monitor = Monitor::new(
            &MonitorConfig::default(),
            transport,
            AudioOutput { player, events },
            tx,
        );
        let task = tokio::spawn(monitor.run());

        Self {
            feed,
            surface,
            playback,
            plays,
            task,
        }
    }

    async fn send(&self, msg: Value) {
        self.feed.send(msg.to_string().into_bytes()).await.unwrap();
    }

    async fn next(&mut self) -> SurfaceMessage {
        tokio::time::timeout(Duration::from_secs(5), self.surface.recv())
            .await
            .expect("timed out waiting for a surface message")
            .expect("surface channel closed")
    }

    /// Skip messages until one of the given kind arrives
    async fn next_of(&mut self, kind: &str) -> SurfaceMessage {
        loop {
            let msg = self.next().await;
            if msg.kind() == kind {
                return msg;
            }
        }
    }

    async fn expect_connected(&mut self) {
        match self.next().await {
            SurfaceMessage::Connection {
                state: ConnectionState::Connected,
            } => {}
            other => panic!("expected Connected, got {other:?}"),
        }
    }

    fn plays(&self) -> Vec<(PlaybackId, PathBuf)> {
        self.plays.lock().unwrap().clone()
    }
}

fn notice(msg: &SurfaceMessage) -> &str {
    match msg {
        SurfaceMessage::Notify { text, .. } => text,
        other => panic!("expected Notify, got {other:?}"),
    }
}

fn now_playing(msg: &SurfaceMessage) -> Option<&str> {
    match msg {
        SurfaceMessage::NowPlaying { clip } => clip.as_deref(),
        other => panic!("expected NowPlaying, got {other:?}"),
    }
}

fn session_start() -> Value {
    json!({
        "type": "SessionStart",
        "exercises_count": 2,
        "exercise_ids": ["squat", "lunge"],
    })
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 80, 120]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

// ============================================================================
// Session Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_full_session_flow() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(session_start()).await;
    match h.next().await {
        SurfaceMessage::SessionInfo { meta } => {
            assert_eq!(meta.exercise_ids, vec!["squat", "lunge"]);
        }
        other => panic!("expected SessionInfo, got {other:?}"),
    }
    assert!(matches!(
        h.next().await,
        SurfaceMessage::HomeVisible { visible: false }
    ));
    assert_eq!(notice(&h.next().await), SESSION_STARTED_NOTICE);

    h.send(json!({"type": "ExerciseStart", "exercise_id": "squat", "repetitions_target": 10}))
        .await;
    match h.next().await {
        SurfaceMessage::ExerciseStatus { exercise } => {
            assert_eq!(exercise.exercise_id, "squat");
            assert_eq!(exercise.repetitions_target, Some(10));
            assert_eq!(exercise.status, ExerciseStatus::Started);
        }
        other => panic!("expected ExerciseStatus, got {other:?}"),
    }
    assert!(matches!(
        h.next().await,
        SurfaceMessage::Repetitions { count: 0 }
    ));

    // Reference clip follows after the transition delay
    let before = tokio::time::Instant::now();
    match h.next().await {
        SurfaceMessage::PlayReference { exercise_id, path } => {
            assert_eq!(exercise_id, "squat");
            assert_eq!(path, PathBuf::from("exercises1/squat/reference.mp4"));
        }
        other => panic!("expected PlayReference, got {other:?}"),
    }
    assert!(before.elapsed() >= Duration::from_millis(500));

    h.send(json!({"type": "ExerciseUpdate", "repetitions": 4})).await;
    assert!(matches!(
        h.next().await,
        SurfaceMessage::Repetitions { count: 4 }
    ));

    h.send(json!({"type": "ExerciseEnd", "exercise_id": "squat"}))
        .await;
    match h.next().await {
        SurfaceMessage::ExerciseStatus { exercise } => {
            assert_eq!(exercise.status, ExerciseStatus::Completed);
        }
        other => panic!("expected ExerciseStatus, got {other:?}"),
    }
    assert!(matches!(h.next().await, SurfaceMessage::PauseReference));

    // The deferred notice shows with the next exercise
    h.send(json!({"type": "ExerciseStart", "exercise_id": "lunge"}))
        .await;
    let notify = h.next_of("notify").await;
    assert_eq!(notice(&notify), NEXT_EXERCISE_NOTICE);

    h.send(json!({"type": "SessionEnd"})).await;
    assert!(matches!(
        h.next_of("home_visible").await,
        SurfaceMessage::HomeVisible { visible: true }
    ));
    assert_eq!(notice(&h.next().await), SESSION_FINISHED_NOTICE);
}

#[tokio::test(start_paused = true)]
async fn test_reference_clip_dropped_when_exercise_ends_early() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(session_start()).await;
    h.send(json!({"type": "ExerciseStart", "exercise_id": "squat"}))
        .await;
    h.send(json!({"type": "ExerciseEnd", "exercise_id": "squat"}))
        .await;
    h.next_of("pause_reference").await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    while let Ok(msg) = h.surface.try_recv() {
        assert!(
            !matches!(msg, SurfaceMessage::PlayReference { .. }),
            "reference clip played after the exercise ended"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_illegal_transition_still_applies_repetitions() {
    let mut h = Harness::start();
    h.expect_connected().await;

    // ExerciseEnd while idle is illegal, the repetition count still applies
    h.send(json!({"type": "ExerciseEnd", "exercise_id": "squat", "repetitions": 7}))
        .await;
    assert!(matches!(
        h.next().await,
        SurfaceMessage::Repetitions { count: 7 }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_does_not_stop_stream() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.feed.send(b"{not json".to_vec()).await.unwrap();
    h.feed.send(b"[1, 2, 3]".to_vec()).await.unwrap();
    h.send(json!({"type": "Teleport"})).await;
    h.send(json!({"type": "ExerciseUpdate", "repetitions": 2}))
        .await;

    assert!(matches!(
        h.next().await,
        SurfaceMessage::Repetitions { count: 2 }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_stream_end_reports_closed() {
    let mut h = Harness::start();
    h.expect_connected().await;

    drop(h.feed);
    match h.surface.recv().await {
        Some(SurfaceMessage::Connection {
            state: ConnectionState::Closed { reason },
        }) => assert_eq!(reason, None),
        other => panic!("expected Closed, got {other:?}"),
    }
    assert!(h.task.await.unwrap().is_ok());
}

// ============================================================================
// Voice Guidance
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_queued_clip_plays_after_current_finishes() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(json!({"type": "ExerciseUpdate", "exercise_id": "squat", "metadata": {"audio": "down.mp3"}}))
        .await;
    assert_eq!(now_playing(&h.next().await), Some("down.mp3"));

    // Arrives while down.mp3 is playing
    h.send(json!({"type": "ExerciseUpdate", "exercise_id": "squat", "metadata": {"audio": "up.mp3"}}))
        .await;
    // Same clip again while it plays is suppressed
    h.send(json!({"type": "ExerciseUpdate", "exercise_id": "squat", "metadata": {"audio": "down.mp3"}}))
        .await;
    // A marker so the queued request is known to be processed
    h.send(json!({"type": "ExerciseUpdate", "repetitions": 1}))
        .await;
    assert!(matches!(
        h.next().await,
        SurfaceMessage::Repetitions { count: 1 }
    ));

    let plays = h.plays();
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].1, PathBuf::from("exercises1/squat/audio/down.mp3"));

    h.playback.send(PlaybackEvent::Finished(plays[0].0)).unwrap();
    assert_eq!(now_playing(&h.next().await), Some("up.mp3"));

    let plays = h.plays();
    assert_eq!(plays.len(), 2);
    assert_eq!(plays[1].1, PathBuf::from("exercises1/squat/audio/up.mp3"));

    h.playback.send(PlaybackEvent::Finished(plays[1].0)).unwrap();
    assert_eq!(now_playing(&h.next().await), None);
}

#[tokio::test(start_paused = true)]
async fn test_clip_scope_falls_back_to_running_exercise() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(session_start()).await;
    h.send(json!({"type": "ExerciseStart", "exercise_id": "lunge"}))
        .await;
    h.send(json!({"type": "ExerciseUpdate", "metadata": {"audio": "knee.mp3"}}))
        .await;

    assert_eq!(now_playing(&h.next_of("now_playing").await), Some("knee.mp3"));
    assert_eq!(
        h.plays()[0].1,
        PathBuf::from("exercises1/lunge/audio/knee.mp3")
    );
}

#[tokio::test(start_paused = true)]
async fn test_unsafe_clip_name_is_never_played() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(json!({"type": "ExerciseUpdate", "exercise_id": "squat", "metadata": {"audio": "../../etc/passwd"}}))
        .await;

    assert_eq!(now_playing(&h.next().await), None);
    assert!(h.plays().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_completion_is_ignored() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(json!({"type": "ExerciseUpdate", "exercise_id": "squat", "metadata": {"audio": "a.mp3"}}))
        .await;
    assert_eq!(now_playing(&h.next().await), Some("a.mp3"));

    h.playback.send(PlaybackEvent::Finished(PlaybackId(999))).unwrap();
    h.send(json!({"type": "ExerciseUpdate", "repetitions": 3}))
        .await;

    // No NowPlaying(None) before the marker
    assert!(matches!(
        h.next().await,
        SurfaceMessage::Repetitions { count: 3 }
    ));
}

// ============================================================================
// Frames
// ============================================================================

#[tokio::test]
async fn test_frame_rendered_with_help_and_labels() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(json!({
        "type": "ExerciseUpdate",
        "frame": jpeg(64, 48),
        "skeleton": {"left_shoulder": [10.0, 10.0], "right_shoulder": [30.0, 10.0]},
        "metadata": {
            "help": "keep your back straight",
            "widgets": [
                {"Circle": {"position": [20.0, 20.0], "text": "3"}},
                {"HLine": {"y": 40.0}},
                {"Sparkle": {"size": 3}}
            ]
        }
    }))
    .await;

    match h.next().await {
        SurfaceMessage::HelpText { text } => assert_eq!(text, "keep your back straight"),
        other => panic!("expected HelpText, got {other:?}"),
    }
    match h.next().await {
        SurfaceMessage::Frame { frame } => {
            assert_eq!((frame.width(), frame.height()), (640, 480));
            assert_eq!(frame.labels.len(), 1);
            assert_eq!(frame.labels[0].text, "3");
        }
        other => panic!("expected Frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_frame_is_skipped() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(json!({
        "type": "ExerciseUpdate",
        "frame": [1, 2, 3, 4],
        "metadata": {"help": "from the broken frame"}
    }))
    .await;
    h.send(json!({
        "type": "ExerciseUpdate",
        "frame": jpeg(8, 8),
        "metadata": {"help": "lower your hips"}
    }))
    .await;

    // The broken frame changes nothing, help arrives with the good one
    match h.next().await {
        SurfaceMessage::HelpText { text } => assert_eq!(text, "lower your hips"),
        other => panic!("expected HelpText, got {other:?}"),
    }
    assert!(matches!(h.next().await, SurfaceMessage::Frame { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_bare_session_start_opens_session() {
    let mut h = Harness::start();
    h.expect_connected().await;

    h.send(json!({"type": "SessionStart"})).await;
    match h.next().await {
        SurfaceMessage::SessionInfo { meta } => {
            assert_eq!(meta.exercises_count, 0);
            assert!(meta.exercise_ids.is_empty());
        }
        other => panic!("expected SessionInfo, got {other:?}"),
    }

    h.send(json!({"type": "ExerciseStart", "exercise_id": "squat"}))
        .await;
    match h.next_of("exercise_status").await {
        SurfaceMessage::ExerciseStatus { exercise } => {
            assert_eq!(exercise.exercise_id, "squat");
            assert_eq!(exercise.status, ExerciseStatus::Started);
        }
        other => panic!("expected ExerciseStatus, got {other:?}"),
    }
}
