//! WebSocket Transport
//!
//! Client side of the session stream over a WebSocket.
//!
//! # Design
//!
//! `connect()` spawns a read task that owns the socket and forwards every
//! text or binary payload into a channel. `recv()` only reads that channel,
//! which keeps it cancel-safe inside the monitor's `select!`. Control
//! frames are handled by tungstenite and never reach the monitor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::traits::{SessionTransport, TransportError};

/// Default time allowed for the WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Payloads buffered between the read task and the monitor
const CHANNEL_CAPACITY: usize = 64;

/// WebSocket client for the session stream
pub struct WebSocketTransport {
    /// Server URL, e.g. `ws://localhost:8765`
    url: String,
    /// Handshake timeout
    connect_timeout: Duration,
    /// Connection state, shared with the read task
    connected: Arc<AtomicBool>,
    /// Payloads from the read task
    payload_rx: Option<mpsc::Receiver<Result<Vec<u8>, TransportError>>>,
    /// Read task handle
    read_task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Create a transport for `url`; nothing happens until `connect()`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connected: Arc::new(AtomicBool::new(false)),
            payload_rx: None,
            read_task: None,
        }
    }

    /// Set the handshake timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Server URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SessionTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Err(TransportError::InvalidState(
                "Already connected".to_string(),
            ));
        }

        let handshake = tokio_tungstenite::connect_async(self.url.as_str());
        let (mut stream, _response) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {e}", self.url)))?;

        tracing::info!(url = %self.url, "Connected to session server");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let connected = Arc::clone(&self.connected);
        connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let payload = match frame {
                    Ok(Message::Text(text)) => text.into_bytes(),
                    Ok(Message::Binary(bytes)) => bytes,
                    Ok(Message::Close(close)) => {
                        tracing::info!(frame = ?close, "Server closed the stream");
                        break;
                    }
                    Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket read error");
                        let _ = tx.send(Err(TransportError::ReceiveFailed(e.to_string()))).await;
                        break;
                    }
                };

                if tx.send(Ok(payload)).await.is_err() {
                    // Receiver dropped
                    break;
                }
            }
            connected.store(false, Ordering::SeqCst);
        });

        self.payload_rx = Some(rx);
        self.read_task = Some(handle);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(handle) = self.read_task.take() {
            handle.abort();
        }
        self.payload_rx = None;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let rx = self
            .payload_rx
            .as_mut()
            .ok_or_else(|| TransportError::InvalidState("Not connected".to_string()))?;

        rx.recv().await.unwrap_or(Err(TransportError::ConnectionClosed))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.read_task.take() {
            handle.abort();
        }
    }
}
