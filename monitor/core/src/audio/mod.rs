//! Voice-Guidance Audio
//!
//! Two halves:
//! - [`AudioScheduler`]: decides whether a requested clip starts now, waits
//!   in the single queue slot or is suppressed. Pure bookkeeping, no I/O.
//! - [`ClipPlayer`]: actually plays a clip file and reports completion on a
//!   channel as a [`PlaybackEvent`].
//!
//! The monitor loop owns both and is the only code that touches scheduler
//! state, so completion events and new requests are serialized without
//! locks.

pub mod scheduler;
pub mod silent;

#[cfg(feature = "rodio-playback")]
pub mod rodio_player;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::assets::AssetError;

pub use scheduler::{AudioScheduler, Decision, SuppressReason, DEFAULT_COOLDOWN};
pub use silent::{SilentPlayer, DEFAULT_SILENT_CLIP};

#[cfg(feature = "rodio-playback")]
pub use rodio_player::RodioPlayer;

/// A voice-guidance clip scoped to an exercise
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioCue {
    /// Exercise that owns the clip
    pub exercise_id: String,
    /// Clip file name
    pub clip: String,
}

impl AudioCue {
    /// Create a cue
    #[must_use]
    pub fn new(exercise_id: impl Into<String>, clip: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            clip: clip.into(),
        }
    }
}

impl fmt::Display for AudioCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.exercise_id, self.clip)
    }
}

/// Identifies one playback attempt
///
/// Completion events carry the id so stale events for a clip that is no
/// longer current can be ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback-{}", self.0)
    }
}

/// A cue the scheduler decided to play
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playback {
    /// Attempt id
    pub id: PlaybackId,
    /// The cue being played
    pub cue: AudioCue,
}

/// Reported by a [`ClipPlayer`] when a playback attempt is over
#[derive(Debug)]
pub enum PlaybackEvent {
    /// The clip played to the end
    Finished(PlaybackId),
    /// The clip could not be played
    Failed(PlaybackId, PlaybackError),
}

/// Why a clip could not be played
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The clip name or exercise id is not usable as a path
    #[error("invalid clip: {0}")]
    InvalidClip(#[from] AssetError),

    /// The clip file could not be opened
    #[error("failed to open {path}: {source}")]
    Open {
        /// Clip path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// The clip file is not decodable audio
    #[error("failed to decode {path}: {reason}")]
    Decode {
        /// Clip path
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// The output device refused playback
    #[error("playback rejected: {0}")]
    Rejected(String),
}

/// Plays clip files
///
/// `play` must return quickly; the outcome of the attempt is reported
/// asynchronously as a [`PlaybackEvent`] on the channel the player was
/// created with. An `Err` from `play` means the attempt never started and no
/// event will follow.
pub trait ClipPlayer: Send {
    /// Start playing the clip at `path`
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if playback could not be started.
    fn play(&mut self, id: PlaybackId, path: &Path) -> Result<(), PlaybackError>;
}

impl<P: ClipPlayer + ?Sized> ClipPlayer for Box<P> {
    fn play(&mut self, id: PlaybackId, path: &Path) -> Result<(), PlaybackError> {
        (**self).play(id, path)
    }
}

/// A player together with the channel it reports on
pub struct AudioOutput<P> {
    /// Plays clips
    pub player: P,
    /// Completion events from `player`
    pub events: mpsc::UnboundedReceiver<PlaybackEvent>,
}

impl AudioOutput<SilentPlayer> {
    /// Silent output completing each clip after `clip_duration`
    #[must_use]
    pub fn silent(clip_duration: Duration) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        Self {
            player: SilentPlayer::new(clip_duration, tx),
            events,
        }
    }
}

impl AudioOutput<Box<dyn ClipPlayer>> {
    /// Output for the running build
    ///
    /// Uses the sound device when built with `rodio-playback` and `audible`
    /// is set, the silent player otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] when the audio thread cannot be started.
    #[cfg_attr(not(feature = "rodio-playback"), allow(clippy::unnecessary_wraps))]
    pub fn for_build(audible: bool, silent_clip: Duration) -> Result<Self, PlaybackError> {
        #[cfg(feature = "rodio-playback")]
        if audible {
            let (tx, events) = mpsc::unbounded_channel();
            let player = RodioPlayer::spawn(tx)?;
            return Ok(Self {
                player: Box::new(player),
                events,
            });
        }

        #[cfg(not(feature = "rodio-playback"))]
        if audible {
            tracing::info!("Built without rodio-playback, voice guidance is silent");
        }

        let AudioOutput { player, events } = AudioOutput::silent(silent_clip);
        Ok(Self {
            player: Box::new(player),
            events,
        })
    }
}
