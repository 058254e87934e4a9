//! Audio Scheduler
//!
//! Decides when voice-guidance clips may play.
//!
//! # Rules
//!
//! A request for clip `C` is evaluated in order:
//! 1. **Start now** if nothing is playing, `C` differs from the last started
//!    clip and the cooldown has elapsed since the last stamp. The stamp is
//!    taken both when a clip starts and when it completes.
//! 2. **Queue** if `C` differs from the last started clip. The queue holds a
//!    single cue; a newer request replaces it.
//! 3. **Suppress** otherwise.
//!
//! When the playing clip completes, the queued cue is promoted unless it is
//! the clip that just finished, in which case the queue is dropped.
//!
//! Time is passed in by the caller so the rules can be tested without a
//! clock.

use std::time::{Duration, Instant};

use super::{AudioCue, Playback, PlaybackId};

/// Minimum gap between clip starts
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(2000);

/// Outcome of a clip request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Play this now
    Start(Playback),
    /// Waiting for the current clip to finish
    Queued(AudioCue),
    /// Dropped
    Suppressed(SuppressReason),
}

/// Why a request was dropped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuppressReason {
    /// The same clip is playing right now
    AlreadyPlaying,
    /// The same clip was started recently and has not completed normally
    RecentlyPlayed,
}

/// Scheduler state for the voice-guidance channel
#[derive(Debug)]
pub struct AudioScheduler {
    cooldown: Duration,
    playing: Option<Playback>,
    queued: Option<AudioCue>,
    last_started: Option<String>,
    last_stamp: Option<Instant>,
    next_id: u64,
}

impl Default for AudioScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl AudioScheduler {
    /// Create a scheduler with the given cooldown
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            playing: None,
            queued: None,
            last_started: None,
            last_stamp: None,
            next_id: 0,
        }
    }

    /// Clip currently playing
    #[must_use]
    pub fn playing(&self) -> Option<&Playback> {
        self.playing.as_ref()
    }

    /// Cue waiting for the current clip to finish
    #[must_use]
    pub fn queued(&self) -> Option<&AudioCue> {
        self.queued.as_ref()
    }

    /// Name of the most recently started clip, cleared on normal completion
    #[must_use]
    pub fn last_started(&self) -> Option<&str> {
        self.last_started.as_deref()
    }

    /// Evaluate a clip request
    ///
    /// Returns `None` when `clip` is `None`.
    pub fn request(
        &mut self,
        exercise_id: &str,
        clip: Option<&str>,
        now: Instant,
    ) -> Option<Decision> {
        let clip = clip?;
        let repeat = self.last_started.as_deref() == Some(clip);

        if self.playing.is_none() && !repeat && self.cooldown_elapsed(now) {
            return Some(Decision::Start(
                self.start(AudioCue::new(exercise_id, clip), now),
            ));
        }

        if !repeat {
            let cue = AudioCue::new(exercise_id, clip);
            if let Some(replaced) = self.queued.replace(cue.clone()) {
                tracing::debug!(replaced = %replaced, queued = %cue, "Replacing queued clip");
            }
            return Some(Decision::Queued(cue));
        }

        let reason = if self.playing.is_some() {
            SuppressReason::AlreadyPlaying
        } else {
            SuppressReason::RecentlyPlayed
        };
        Some(Decision::Suppressed(reason))
    }

    /// The clip with `id` played to the end
    ///
    /// Returns the promoted cue to play next, if any. Events for a playback
    /// that is not current are ignored.
    pub fn on_finished(&mut self, id: PlaybackId, now: Instant) -> Option<Playback> {
        let finished = self.take_current(id)?;
        self.last_started = None;
        self.last_stamp = Some(now);
        self.promote(&finished, now)
    }

    /// The clip with `id` could not be played
    ///
    /// The slot is freed but the clip stays recorded as last started, so the
    /// same request is suppressed instead of retried. Queue handling is the
    /// same as [`on_finished`](Self::on_finished).
    pub fn on_failed(&mut self, id: PlaybackId, now: Instant) -> Option<Playback> {
        let failed = self.take_current(id)?;
        self.last_stamp = Some(now);
        self.promote(&failed, now)
    }

    fn take_current(&mut self, id: PlaybackId) -> Option<Playback> {
        if self.playing.as_ref().map(|p| p.id) != Some(id) {
            tracing::debug!(playback = %id, "Ignoring completion of stale playback");
            return None;
        }
        self.playing.take()
    }

    fn promote(&mut self, previous: &Playback, now: Instant) -> Option<Playback> {
        let next = self.queued.take()?;
        if next.clip == previous.cue.clip {
            tracing::debug!(clip = %next.clip, "Dropping queued repeat of finished clip");
            return None;
        }
        Some(self.start(next, now))
    }

    fn start(&mut self, cue: AudioCue, now: Instant) -> Playback {
        self.next_id += 1;
        let playback = Playback {
            id: PlaybackId(self.next_id),
            cue,
        };
        self.playing = Some(playback.clone());
        self.last_started = Some(playback.cue.clip.clone());
        self.last_stamp = Some(now);
        self.queued = None;
        playback
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.last_stamp
            .map_or(true, |stamp| now.saturating_duration_since(stamp) >= self.cooldown)
    }
}
