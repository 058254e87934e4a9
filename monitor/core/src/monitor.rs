//! Monitor - the session event loop
//!
//! The Monitor is the only owner of session, scheduler and render state. It
//! consumes raw payloads from a [`SessionTransport`], applies them and tells
//! the surface what to show through [`SurfaceMessage`]s.
//!
//! # Design Philosophy
//!
//! Everything mutable lives in one task and is touched only from the
//! `select!` loop in [`Monitor::run`]. Frame decoding is the one piece of
//! work moved off the loop (`spawn_blocking`); its results come back through
//! the same loop tagged with a sequence number, so an older frame finishing
//! late never replaces a newer one. At most [`MAX_RENDERS_IN_FLIGHT`]
//! renders run at once; beyond that only the newest waiting frame is kept.
//!
//! ```text
//! transport ──► decode ──► SessionMachine ──► effects ──┐
//!                  │                                     ├──► SurfaceMessage
//!                  ├──► AudioScheduler ──► ClipPlayer ───┤
//!                  └──► spawn_blocking(render) ──────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

use crate::assets::AssetLayout;
use crate::audio::{
    AudioOutput, AudioScheduler, ClipPlayer, Decision, Playback, PlaybackError, PlaybackEvent,
    PlaybackId,
};
use crate::config::MonitorConfig;
use crate::messages::{ConnectionState, SurfaceMessage};
use crate::overlay::{FrameError, OverlayRenderer, RenderedFrame};
use crate::protocol::{self, InboundMessage, Skeleton, Widget};
use crate::session::{SessionEffect, SessionMachine};
use crate::transport::{SessionTransport, TransportError};

/// Errors that stop the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The session server could not be reached at startup
    #[error("failed to connect to session server: {0}")]
    Connect(#[source] TransportError),
}

/// Timing and feature switches taken from [`MonitorConfig`]
#[derive(Clone, Debug)]
pub struct MonitorSettings {
    /// Delay between an exercise starting and its reference clip playing
    pub transition_delay: Duration,
    /// How long notifications stay on screen
    pub notification: Duration,
    /// Whether voice guidance is requested at all
    pub audio_enabled: bool,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            transition_delay: config.transition_delay,
            notification: config.notification,
            audio_enabled: config.audio_enabled,
        }
    }
}

/// Reference clip waiting for the transition delay
#[derive(Debug)]
struct PendingReference {
    due: Instant,
    exercise_id: String,
}

/// Renders allowed on the blocking pool at once
pub const MAX_RENDERS_IN_FLIGHT: usize = 2;

/// One frame waiting to be rendered
#[derive(Debug)]
struct FrameJob {
    seq: u64,
    frame: Vec<u8>,
    skeleton: Skeleton,
    widgets: Vec<Widget>,
    /// Shown together with the frame once it decodes
    help: String,
}

/// A finished render, tagged with its frame's sequence number
#[derive(Debug)]
struct RenderOutcome {
    seq: u64,
    help: String,
    result: Result<RenderedFrame, FrameError>,
}

/// Orders frame completions that may finish out of order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSequence {
    submitted: u64,
    presented: u64,
}

impl FrameSequence {
    /// Sequence number for the next arriving frame
    pub fn next(&mut self) -> u64 {
        self.submitted += 1;
        self.submitted
    }

    /// Whether a completed frame is newer than the one on screen
    ///
    /// Accepting a frame makes it the one on screen.
    pub fn present(&mut self, seq: u64) -> bool {
        if seq <= self.presented {
            return false;
        }
        self.presented = seq;
        true
    }

    /// Sequence number of the frame on screen (0 before the first)
    #[must_use]
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

/// The session event loop
pub struct Monitor<T: SessionTransport, P: ClipPlayer> {
    /// Where payloads come from
    transport: T,
    /// Plays voice-guidance clips
    player: P,
    /// Completion events from `player`
    playback_events: mpsc::UnboundedReceiver<PlaybackEvent>,
    /// Channel to the surface
    tx: mpsc::Sender<SurfaceMessage>,
    /// Session lifecycle
    session: SessionMachine,
    /// Voice-guidance bookkeeping
    scheduler: AudioScheduler,
    /// Frame renderer, copied into each render job
    renderer: OverlayRenderer,
    /// Clip and reference locations
    assets: AssetLayout,
    /// Timing and feature switches
    settings: MonitorSettings,
    /// In-flight frame renders
    renders: JoinSet<RenderOutcome>,
    /// Newest frame waiting for a render slot
    waiting_frame: Option<FrameJob>,
    /// Frame ordering
    frames: FrameSequence,
    /// Reference clip waiting for its delay to elapse
    pending_reference: Option<PendingReference>,
}

impl<T: SessionTransport, P: ClipPlayer> Monitor<T, P> {
    /// Create a monitor from a loaded configuration
    pub fn new(
        config: &MonitorConfig,
        transport: T,
        audio: AudioOutput<P>,
        tx: mpsc::Sender<SurfaceMessage>,
    ) -> Self {
        Self::with_parts(
            transport,
            audio,
            tx,
            AudioScheduler::new(config.audio_cooldown),
            OverlayRenderer::new(config.overlay_width, config.overlay_height),
            AssetLayout::new(config.asset_root.clone()),
            MonitorSettings::from(config),
        )
    }

    /// Create a monitor from its individual parts
    pub fn with_parts(
        transport: T,
        audio: AudioOutput<P>,
        tx: mpsc::Sender<SurfaceMessage>,
        scheduler: AudioScheduler,
        renderer: OverlayRenderer,
        assets: AssetLayout,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            transport,
            player: audio.player,
            playback_events: audio.events,
            tx,
            session: SessionMachine::new(),
            scheduler,
            renderer,
            assets,
            settings,
            renders: JoinSet::new(),
            waiting_frame: None,
            frames: FrameSequence::default(),
            pending_reference: None,
        }
    }

    /// Session state
    pub fn session(&self) -> &SessionMachine {
        &self.session
    }

    /// Voice-guidance state
    pub fn scheduler(&self) -> &AudioScheduler {
        &self.scheduler
    }

    // ============================================
    // Event Loop
    // ============================================

    /// Run until the stream ends or the surface goes away
    ///
    /// Connects first when the transport is not connected yet.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Connect`] if the initial connection fails.
    /// Everything after that is logged and survived.
    pub async fn run(mut self) -> Result<(), MonitorError> {
        if !self.transport.is_connected() {
            self.transport.connect().await.map_err(MonitorError::Connect)?;
        }
        self.send(SurfaceMessage::Connection {
            state: ConnectionState::Connected,
        })
        .await;

        loop {
            let reference_due = self.pending_reference.as_ref().map(|p| p.due);

            tokio::select! {
                biased;

                () = self.tx.closed() => {
                    tracing::info!("Surface closed, stopping monitor");
                    break;
                }

                Some(event) = self.playback_events.recv() => {
                    self.handle_playback_event(event).await;
                }

                Some(joined) = self.renders.join_next(), if !self.renders.is_empty() => {
                    self.handle_render(joined).await;
                }

                () = tokio::time::sleep_until(reference_due.unwrap_or_else(Instant::now)),
                    if reference_due.is_some() =>
                {
                    self.fire_reference().await;
                }

                payload = self.transport.recv() => match payload {
                    Ok(bytes) => self.handle_payload(&bytes).await,
                    Err(TransportError::ConnectionClosed) => {
                        tracing::info!("Session stream ended");
                        self.send(SurfaceMessage::Connection {
                            state: ConnectionState::Closed { reason: None },
                        })
                        .await;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Session stream failed");
                        self.send(SurfaceMessage::Connection {
                            state: ConnectionState::Closed {
                                reason: Some(e.to_string()),
                            },
                        })
                        .await;
                        break;
                    }
                },
            }
        }

        if let Err(e) = self.transport.disconnect().await {
            tracing::debug!(error = %e, "Disconnect failed");
        }
        Ok(())
    }

    /// Apply one raw payload
    ///
    /// Malformed payloads are logged and dropped.
    pub async fn handle_payload(&mut self, payload: &[u8]) {
        match protocol::decode(payload) {
            Ok(msg) => self.handle_message(msg).await,
            Err(e) => {
                tracing::warn!(error = %e, bytes = payload.len(), "Dropping malformed message");
            }
        }
    }

    /// Apply one decoded message
    ///
    /// Lifecycle first, then voice guidance and the frame. Help text travels
    /// with the frame and is shown only if the frame decodes.
    pub async fn handle_message(&mut self, mut msg: InboundMessage) {
        tracing::debug!(
            kind = %msg.kind,
            exercise_id = ?msg.exercise_id,
            repetitions = ?msg.repetitions,
            frame_bytes = msg.frame.len(),
            "Inbound message"
        );

        for effect in self.session.apply(&msg) {
            self.apply_effect(effect).await;
        }

        if self.settings.audio_enabled {
            self.request_clip(&msg).await;
        }

        if msg.has_frame() {
            self.submit_frame(&mut msg);
        }
    }

    // ============================================
    // Session Effects
    // ============================================

    async fn apply_effect(&mut self, effect: SessionEffect) {
        let msg = match effect {
            SessionEffect::HideHome => SurfaceMessage::HomeVisible { visible: false },
            SessionEffect::ShowHome => {
                self.pending_reference = None;
                SurfaceMessage::HomeVisible { visible: true }
            }
            SessionEffect::Notify(text) => SurfaceMessage::Notify {
                text,
                duration: self.settings.notification,
            },
            SessionEffect::ExerciseStatus(exercise) => SurfaceMessage::ExerciseStatus { exercise },
            SessionEffect::Repetitions(count) => SurfaceMessage::Repetitions { count },
            SessionEffect::SessionStarted(meta) => SurfaceMessage::SessionInfo { meta },
            SessionEffect::PlayReference { exercise_id } => {
                self.pending_reference = Some(PendingReference {
                    due: Instant::now() + self.settings.transition_delay,
                    exercise_id,
                });
                return;
            }
            SessionEffect::PauseReference => {
                self.pending_reference = None;
                SurfaceMessage::PauseReference
            }
        };
        self.send(msg).await;
    }

    async fn fire_reference(&mut self) {
        let Some(pending) = self.pending_reference.take() else {
            return;
        };

        if self.session.running_exercise_id() != Some(pending.exercise_id.as_str()) {
            tracing::debug!(exercise_id = %pending.exercise_id, "Exercise changed, skipping reference clip");
            return;
        }

        match self.assets.reference_path(&pending.exercise_id) {
            Ok(path) => {
                self.send(SurfaceMessage::PlayReference {
                    exercise_id: pending.exercise_id,
                    path,
                })
                .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, exercise_id = %pending.exercise_id, "No reference clip");
            }
        }
    }

    // ============================================
    // Voice Guidance
    // ============================================

    async fn request_clip(&mut self, msg: &InboundMessage) {
        let Some(clip) = msg.audio_clip() else {
            return;
        };
        let scope = msg
            .audio_scope()
            .or_else(|| self.session.current_exercise().map(|e| e.exercise_id.as_str()));
        let Some(scope) = scope else {
            tracing::debug!(clip, "Clip without exercise, ignoring");
            return;
        };

        let decision = self.scheduler.request(scope, Some(clip), now());
        match decision {
            Some(Decision::Start(playback)) => self.launch(Some(playback)).await,
            Some(Decision::Queued(cue)) => tracing::debug!(cue = %cue, "Clip queued"),
            Some(Decision::Suppressed(reason)) => {
                tracing::trace!(clip, reason = ?reason, "Clip suppressed");
            }
            None => {}
        }
    }

    /// Hand clips to the player until one starts or none is left
    async fn launch(&mut self, mut next: Option<Playback>) {
        while let Some(playback) = next.take() {
            let started = self
                .assets
                .clip_path(&playback.cue.exercise_id, &playback.cue.clip)
                .map_err(PlaybackError::from)
                .and_then(|path| self.player.play(playback.id, &path));

            match started {
                Ok(()) => {
                    tracing::info!(playback = %playback.id, cue = %playback.cue, "Playing clip");
                    self.send(SurfaceMessage::NowPlaying {
                        clip: Some(playback.cue.clip),
                    })
                    .await;
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, cue = %playback.cue, "Clip could not be played");
                    next = self.scheduler.on_failed(playback.id, now());
                }
            }
        }

        self.send(SurfaceMessage::NowPlaying { clip: None }).await;
    }

    async fn handle_playback_event(&mut self, event: PlaybackEvent) {
        let id = match &event {
            PlaybackEvent::Finished(id) | PlaybackEvent::Failed(id, _) => *id,
        };
        if !self.is_current_playback(id) {
            tracing::debug!(playback = %id, "Ignoring stale playback event");
            return;
        }

        let next = match event {
            PlaybackEvent::Finished(id) => {
                tracing::debug!(playback = %id, "Clip finished");
                self.scheduler.on_finished(id, now())
            }
            PlaybackEvent::Failed(id, e) => {
                tracing::warn!(error = %e, playback = %id, "Clip playback failed");
                self.scheduler.on_failed(id, now())
            }
        };
        self.launch(next).await;
    }

    fn is_current_playback(&self, id: PlaybackId) -> bool {
        self.scheduler.playing().is_some_and(|p| p.id == id)
    }

    // ============================================
    // Frames
    // ============================================

    fn submit_frame(&mut self, msg: &mut InboundMessage) {
        let job = FrameJob {
            seq: self.frames.next(),
            frame: std::mem::take(&mut msg.frame),
            skeleton: std::mem::take(&mut msg.skeleton),
            help: msg.help_text().unwrap_or_default().to_string(),
            widgets: msg
                .metadata
                .as_mut()
                .map(|m| std::mem::take(&mut m.widgets))
                .unwrap_or_default(),
        };

        if self.renders.len() >= MAX_RENDERS_IN_FLIGHT {
            if let Some(dropped) = self.waiting_frame.replace(job) {
                tracing::trace!(seq = dropped.seq, "Renderer busy, dropping waiting frame");
            }
            return;
        }
        self.spawn_render(job);
    }

    fn spawn_render(&mut self, job: FrameJob) {
        let renderer = self.renderer;
        self.renders.spawn_blocking(move || RenderOutcome {
            seq: job.seq,
            result: renderer.render_bytes(&job.frame, &job.skeleton, &job.widgets),
            help: job.help,
        });
    }

    async fn handle_render(&mut self, joined: Result<RenderOutcome, JoinError>) {
        if let Some(job) = self.waiting_frame.take() {
            self.spawn_render(job);
        }

        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Render task failed");
                return;
            }
        };
        self.present(outcome).await;
    }

    async fn present(&mut self, outcome: RenderOutcome) {
        let RenderOutcome { seq, help, result } = outcome;
        match result {
            Ok(frame) => {
                if !self.frames.present(seq) {
                    tracing::trace!(seq, presented = self.frames.presented(), "Dropping stale frame");
                    return;
                }
                self.send(SurfaceMessage::HelpText { text: help }).await;
                self.send(SurfaceMessage::Frame {
                    frame: Arc::new(frame),
                })
                .await;
            }
            Err(e) => tracing::warn!(error = %e, seq, "Skipping frame"),
        }
    }

    /// Send a message to the surface
    async fn send(&mut self, msg: SurfaceMessage) {
        let kind = msg.kind();
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!(kind, "Failed to send message to surface: {}", e);
        }
    }
}

/// Scheduler clock, following tokio's clock so paused-time tests hold
fn now() -> std::time::Instant {
    Instant::now().into_std()
}
