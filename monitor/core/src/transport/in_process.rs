//! In-Process Transport
//!
//! Channel-backed transport for embedding a stream producer in the same
//! process: tests, replays of recorded sessions, or a local tracker.
//!
//! # Usage
//!
//! ```ignore
//! let (transport, feed) = InProcessTransport::new_pair();
//!
//! // Give `transport` to the Monitor, push payloads through `feed`
//! feed.send(br#"{"type":"SessionStart","exercise_ids":["squat"]}"#.to_vec()).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{SessionTransport, TransportError};

/// In-process transport using a tokio channel
///
/// Dropping every sender ends the stream, which the monitor observes as
/// [`TransportError::ConnectionClosed`].
pub struct InProcessTransport {
    /// Channel carrying payloads from the producer
    payload_rx: mpsc::Receiver<Vec<u8>>,
    /// Connection state
    connected: Arc<AtomicBool>,
}

impl InProcessTransport {
    /// Create a transport and the sender that feeds it
    #[must_use]
    pub fn new_pair() -> (Self, mpsc::Sender<Vec<u8>>) {
        Self::new_pair_with_capacity(100)
    }

    /// Create with custom channel capacity
    #[must_use]
    pub fn new_pair_with_capacity(capacity: usize) -> (Self, mpsc::Sender<Vec<u8>>) {
        let (payload_tx, payload_rx) = mpsc::channel(capacity);

        let transport = Self {
            payload_rx,
            connected: Arc::new(AtomicBool::new(true)),
        };

        (transport, payload_tx)
    }
}

#[async_trait]
impl SessionTransport for InProcessTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.payload_rx.close();
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::InvalidState(
                "Transport not connected".to_string(),
            ));
        }

        match self.payload_rx.recv().await {
            Some(payload) => Ok(payload),
            None => {
                self.connected.store(false, Ordering::SeqCst);
                Err(TransportError::ConnectionClosed)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
