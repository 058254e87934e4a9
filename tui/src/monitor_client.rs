//! Monitor Client
//!
//! Thin wrapper around the session monitor for TUI integration.
//! The monitor runs as its own task; this client holds the receiving end of
//! its surface channel and the task handle.
//!
//! # Architecture
//!
//! The TUI is a "thin client" - it doesn't contain any session logic.
//! Everything happens in the monitor. The TUI's job is:
//! 1. Receive `SurfaceMessage`s
//! 2. Render display state based on messages
//! 3. Handle quitting

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use actionq_core::{
    AudioOutput, ClipPlayer, Monitor, MonitorConfig, MonitorError, SessionTransport,
    SurfaceMessage, WebSocketTransport,
};

/// Capacity of the monitor -> TUI channel
const SURFACE_CHANNEL: usize = 256;

/// Client for the background monitor task
pub struct MonitorClient {
    /// Receiver for messages from the monitor
    rx: mpsc::Receiver<SurfaceMessage>,
    /// The monitor task, until its outcome has been collected
    task: Option<JoinHandle<Result<(), MonitorError>>>,
}

impl MonitorClient {
    /// Connect to the session server named in `config`
    ///
    /// # Errors
    ///
    /// Returns an error when audio output cannot be started. Connection
    /// failures surface later through [`MonitorClient::poll_exit`].
    pub fn connect(config: &MonitorConfig) -> anyhow::Result<Self> {
        let transport = WebSocketTransport::new(config.url.clone())
            .with_connect_timeout(config.connect_timeout);
        let audio = AudioOutput::for_build(config.audio_enabled, config.silent_clip)?;
        Ok(Self::spawn(config, transport, audio))
    }

    /// Run a monitor over any transport and player
    pub fn spawn<T, P>(config: &MonitorConfig, transport: T, audio: AudioOutput<P>) -> Self
    where
        T: SessionTransport + 'static,
        P: ClipPlayer + 'static,
    {
        let (tx, rx) = mpsc::channel(SURFACE_CHANNEL);
        let monitor = Monitor::new(config, transport, audio, tx);
        let task = tokio::spawn(monitor.run());
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Try to receive a message from the monitor (non-blocking)
    pub fn try_recv(&mut self) -> Option<SurfaceMessage> {
        self.rx.try_recv().ok()
    }

    /// Receive all pending messages from the monitor (non-blocking)
    pub fn recv_all(&mut self) -> Vec<SurfaceMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Collect the monitor's outcome once its task has finished
    ///
    /// Returns `None` while the task is alive and after the outcome has
    /// been collected.
    pub async fn poll_exit(&mut self) -> Option<anyhow::Result<()>> {
        if !self.task.as_ref().is_some_and(JoinHandle::is_finished) {
            return None;
        }
        let task = self.task.take()?;

        Some(match task.await {
            Ok(result) => result.map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::anyhow!("monitor task failed: {e}")),
        })
    }
}

impl Drop for MonitorClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
