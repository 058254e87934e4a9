//! Silent Player
//!
//! A [`ClipPlayer`] that plays nothing and reports each clip as finished
//! after a fixed nominal duration. Used when audio output is disabled and in
//! tests, where it keeps the scheduler's timing behavior intact.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;

use super::{ClipPlayer, PlaybackError, PlaybackEvent, PlaybackId};

/// Nominal clip length when nothing is actually played
pub const DEFAULT_SILENT_CLIP: Duration = Duration::from_millis(1500);

/// Completes every clip after a fixed duration without producing sound
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct SilentPlayer {
    clip_duration: Duration,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl SilentPlayer {
    /// Create a player reporting on `events`
    #[must_use]
    pub fn new(clip_duration: Duration, events: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        Self {
            clip_duration,
            events,
        }
    }
}

impl ClipPlayer for SilentPlayer {
    fn play(&mut self, id: PlaybackId, path: &Path) -> Result<(), PlaybackError> {
        tracing::debug!(playback = %id, path = %path.display(), "Silent playback");

        let events = self.events.clone();
        let deadline = tokio::time::Instant::now() + self.clip_duration;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // Receiver gone means the monitor shut down
            let _ = events.send(PlaybackEvent::Finished(id));
        });
        Ok(())
    }
}
