//! Rodio Player
//!
//! Plays clips on the default output device.
//!
//! `rodio::OutputStream` is not `Send`, so a dedicated `audio-engine` thread
//! owns the stream and every sink. The player only sends commands to that
//! thread. Completion is detected by polling the sink between commands.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::sync::mpsc;

use super::{ClipPlayer, PlaybackError, PlaybackEvent, PlaybackId};

/// How often the engine thread checks whether the current clip has drained
const DRAIN_POLL: Duration = Duration::from_millis(50);

enum EngineCommand {
    Play { id: PlaybackId, path: PathBuf },
}

/// Plays clips through rodio on a dedicated thread
pub struct RodioPlayer {
    commands: std_mpsc::Sender<EngineCommand>,
}

impl RodioPlayer {
    /// Spawn the engine thread
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Rejected`] if the thread cannot be spawned.
    /// A missing output device is reported per clip, not here.
    pub fn spawn(events: mpsc::UnboundedSender<PlaybackEvent>) -> Result<Self, PlaybackError> {
        let (tx, rx) = std_mpsc::channel::<EngineCommand>();

        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || run_engine(&rx, &events))
            .map_err(|e| PlaybackError::Rejected(format!("failed to spawn audio thread: {e}")))?;

        Ok(Self { commands: tx })
    }
}

impl ClipPlayer for RodioPlayer {
    fn play(&mut self, id: PlaybackId, path: &Path) -> Result<(), PlaybackError> {
        self.commands
            .send(EngineCommand::Play {
                id,
                path: path.to_path_buf(),
            })
            .map_err(|_| PlaybackError::Rejected("audio thread stopped".to_string()))
    }
}

fn run_engine(
    commands: &std_mpsc::Receiver<EngineCommand>,
    events: &mpsc::UnboundedSender<PlaybackEvent>,
) {
    let output = match OutputStream::try_default() {
        Ok(output) => Some(output),
        Err(e) => {
            tracing::warn!(error = %e, "No audio output device, clips will fail");
            None
        }
    };

    let mut current: Option<(PlaybackId, Sink)> = None;

    loop {
        match commands.recv_timeout(DRAIN_POLL) {
            Ok(EngineCommand::Play { id, path }) => {
                if let Some((previous, sink)) = current.take() {
                    tracing::debug!(playback = %previous, "Interrupting clip");
                    sink.stop();
                }
                let handle = output.as_ref().map(|(_, handle)| handle);
                match start_clip(handle, &path) {
                    Ok(sink) => current = Some((id, sink)),
                    Err(e) => {
                        if events.send(PlaybackEvent::Failed(id, e)).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Err(std_mpsc::RecvTimeoutError::Disconnected) => return,
        }

        if current.as_ref().is_some_and(|(_, sink)| sink.empty()) {
            if let Some((id, _)) = current.take() {
                if events.send(PlaybackEvent::Finished(id)).is_err() {
                    return;
                }
            }
        }
    }
}

fn start_clip(handle: Option<&OutputStreamHandle>, path: &Path) -> Result<Sink, PlaybackError> {
    let handle =
        handle.ok_or_else(|| PlaybackError::Rejected("no audio output device".to_string()))?;

    let file = File::open(path).map_err(|source| PlaybackError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let source = Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let sink = Sink::try_new(handle).map_err(|e| PlaybackError::Rejected(e.to_string()))?;
    sink.append(source);
    Ok(sink)
}
