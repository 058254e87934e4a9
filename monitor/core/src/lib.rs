//! ActionQ Core - Headless Session Monitor
//!
//! This crate turns the pose-tracking server's message stream into
//! presentation directives, independent of any UI framework. It can drive
//! the terminal UI or run headless.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Surfaces                                │
//! │        ┌────────────────┐          ┌──────────────────┐         │
//! │        │  actionq-tui   │          │ actionq-headless │         │
//! │        │   (ratatui)    │          │  (logs / PNG)    │         │
//! │        └───────┬────────┘          └────────┬─────────┘         │
//! │                └─────────────┬──────────────┘                    │
//! │                     SurfaceMessage (down)                        │
//! └──────────────────────────────┼───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                        ACTIONQ CORE                               │
//! │  ┌───────────────────────────┴────────────────────────────────┐  │
//! │  │                         Monitor                             │  │
//! │  │  ┌──────────┐  ┌───────────┐  ┌──────────┐  ┌───────────┐  │  │
//! │  │  │ Session  │  │   Audio   │  │ Overlay  │  │  Assets   │  │  │
//! │  │  │ Machine  │  │ Scheduler │  │ Renderer │  │  Layout   │  │  │
//! │  │  └──────────┘  └───────────┘  └──────────┘  └───────────┘  │  │
//! │  └─────────────────────────────┬──────────────────────────────┘  │
//! │                        SessionTransport                          │
//! └────────────────────────────────┼─────────────────────────────────┘
//!                                  │ WebSocket (receive-only)
//!                         pose-tracking server
//! ```
//!
//! # Key Types
//!
//! - [`Monitor`]: the event loop owning all session state
//! - [`SurfaceMessage`]: directives sent to a surface
//! - [`InboundMessage`]: one decoded server message
//! - [`SessionMachine`]: session and exercise lifecycle
//! - [`AudioScheduler`]: voice-guidance cooldown, queue and suppression
//! - [`OverlayRenderer`]: frame, skeleton and widget drawing
//!
//! # Quick Start
//!
//! ```ignore
//! use actionq_core::{config, AudioOutput, Monitor, WebSocketTransport};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = config::load_config()?;
//!     let (tx, mut rx) = mpsc::channel(64);
//!
//!     let transport = WebSocketTransport::new(&config.url);
//!     let audio = AudioOutput::silent(config.silent_clip);
//!     tokio::spawn(Monitor::new(&config, transport, audio, tx).run());
//!
//!     while let Some(msg) = rx.recv().await {
//!         // Apply to the display
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # No TUI Dependencies
//!
//! This crate has no dependency on ratatui, crossterm or any other UI
//! framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod audio;
pub mod config;
pub mod messages;
pub mod monitor;
pub mod overlay;
pub mod protocol;
pub mod session;
pub mod transport;

pub use assets::AssetLayout;
pub use audio::{AudioOutput, AudioScheduler, ClipPlayer, Decision, PlaybackEvent};
pub use config::{ConfigOverrides, MonitorConfig};
pub use messages::{ConnectionState, SurfaceMessage};
pub use monitor::{Monitor, MonitorError, MonitorSettings};
pub use overlay::{OverlayLabel, OverlayRenderer, RenderedFrame};
pub use protocol::{decode, EventKind, InboundMessage, Point, Skeleton, Widget};
pub use session::{ExerciseState, ExerciseStatus, SessionMachine, SessionMeta};
pub use transport::{InProcessTransport, SessionTransport, TransportError};

#[cfg(feature = "websocket")]
pub use transport::WebSocketTransport;
