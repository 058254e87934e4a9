//! Transport Traits
//!
//! The monitor receives the session stream through [`SessionTransport`].
//! The stream is receive-only: the monitor never sends protocol messages
//! back to the server.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// Errors that can occur during transport operations
#[derive(Debug)]
pub enum TransportError {
    /// Connection to the server failed
    ConnectionFailed(String),
    /// Connecting took longer than the configured timeout
    Timeout(Duration),
    /// The stream ended
    ConnectionClosed,
    /// Reading from the stream failed
    ReceiveFailed(String),
    /// IO error from the underlying socket
    IoError(std::io::Error),
    /// Transport not in the expected state
    InvalidState(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed(msg) => write!(f, "Connection failed: {msg}"),
            Self::Timeout(after) => write!(f, "Connection timed out after {}ms", after.as_millis()),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::ReceiveFailed(msg) => write!(f, "Receive failed: {msg}"),
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

/// Receiving side of the session stream
///
/// Each payload is the raw body of one text or binary frame, handed to
/// [`protocol::decode`](crate::protocol::decode) by the monitor.
#[async_trait]
pub trait SessionTransport: Send {
    /// Connect to the session server
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the connection
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Receive the next payload
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the stream has
    /// ended. Must be cancel-safe: the monitor polls it inside `select!`.
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Check if currently connected
    fn is_connected(&self) -> bool;
}
