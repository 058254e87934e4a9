//! Transport Layer
//!
//! Abstracts where the session stream comes from.
//!
//! # Transports
//!
//! - **WebSocket**: the session server, default `ws://localhost:8765`
//! - **In-process**: channel-backed, for tests and replays
//!
//! Both deliver raw payloads; decoding happens in the monitor.

pub mod in_process;
pub mod traits;
#[cfg(feature = "websocket")]
pub mod websocket;

pub use in_process::InProcessTransport;
pub use traits::{SessionTransport, TransportError};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketTransport, DEFAULT_CONNECT_TIMEOUT};

/// Default session server address
pub const DEFAULT_URL: &str = "ws://localhost:8765";
