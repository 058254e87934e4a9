//! ActionQ Headless Monitor
//!
//! Runs the session monitor without a UI. Every directive is logged, and the
//! latest overlay frame can be written to a PNG file on exit.
//!
//! # Usage
//!
//! ```bash
//! # Connect to the default server (ws://localhost:8765)
//! actionq-headless
//!
//! # Custom server, keep the last frame
//! actionq-headless --url ws://10.0.0.2:8765 --snapshot last.png
//!
//! # With verbose logging
//! RUST_LOG=debug actionq-headless
//! ```
//!
//! # Environment Variables
//!
//! - `ACTIONQ_URL`: Session server URL
//! - `ACTIONQ_ASSETS`: Exercise asset root
//! - `ACTIONQ_AUDIO`: `0`/`false` disables voice guidance
//! - `ACTIONQ_COOLDOWN_MS`: Voice-guidance cooldown
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use actionq_core::{
    config::{self, ConfigOverrides},
    AudioOutput, ConnectionState, Monitor, RenderedFrame, SurfaceMessage, WebSocketTransport,
};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "actionq-headless", version, about = "Headless ActionQ session monitor")]
struct Args {
    /// Session server URL
    #[arg(long)]
    url: Option<String>,

    /// Configuration file (default: ~/.config/actionq/monitor.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exercise asset root
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Disable voice guidance
    #[arg(long)]
    no_audio: bool,

    /// Write the last overlay frame to this PNG file on exit
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("actionq_headless=info".parse()?)
                .add_directive("actionq_core=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = config::load_config_from_path(args.config.or_else(config::default_config_path))
        .context("Failed to load configuration")?;
    let mut overrides = ConfigOverrides::new();
    if let Some(url) = args.url {
        overrides = overrides.with_url(url);
    }
    if let Some(root) = args.assets {
        overrides = overrides.with_asset_root(root);
    }
    if args.no_audio {
        overrides = overrides.with_audio_enabled(false);
    }
    overrides.apply(&mut config);
    config.validate()?;

    info!(url = %config.url, source = %config.source(), "Starting headless monitor");

    let transport =
        WebSocketTransport::new(config.url.clone()).with_connect_timeout(config.connect_timeout);
    let audio = AudioOutput::for_build(config.audio_enabled, config.silent_clip)
        .context("Failed to start audio output")?;

    let (tx, mut rx) = mpsc::channel::<SurfaceMessage>(64);
    let monitor = Monitor::new(&config, transport, audio, tx);
    let mut monitor_task = tokio::spawn(monitor.run());

    let mut latest: Option<Arc<RenderedFrame>> = None;

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(msg) => log_directive(&msg, &mut latest),
                None => {
                    // The monitor dropped its sender; surface its outcome
                    (&mut monitor_task).await.context("Monitor task panicked")??;
                    break;
                }
            },
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                monitor_task.abort();
                break;
            }
            joined = &mut monitor_task => {
                joined.context("Monitor task panicked")??;
                // Drain what the monitor sent before it stopped
                while let Ok(msg) = rx.try_recv() {
                    log_directive(&msg, &mut latest);
                }
                break;
            }
        }
    }

    if let (Some(path), Some(frame)) = (args.snapshot, latest) {
        frame
            .image
            .save(&path)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
        info!(path = %path.display(), "Snapshot written");
    }

    Ok(())
}

fn log_directive(msg: &SurfaceMessage, latest: &mut Option<Arc<RenderedFrame>>) {
    match msg {
        SurfaceMessage::HomeVisible { visible } => info!(visible, "Home overlay"),
        SurfaceMessage::SessionInfo { meta } => info!(
            exercises = meta.exercises_count,
            ids = ?meta.exercise_ids,
            "Session started"
        ),
        SurfaceMessage::Notify { text, .. } => info!(%text, "Notification"),
        SurfaceMessage::ExerciseStatus { exercise } => info!(
            exercise_id = %exercise.exercise_id,
            status = %exercise.status,
            "Exercise status"
        ),
        SurfaceMessage::Repetitions { count } => info!(count, "Repetitions"),
        SurfaceMessage::HelpText { text } if !text.is_empty() => info!(%text, "Help"),
        SurfaceMessage::HelpText { .. } => {}
        SurfaceMessage::PlayReference { exercise_id, path } => {
            info!(%exercise_id, path = %path.display(), "Play reference clip");
        }
        SurfaceMessage::PauseReference => info!("Pause reference clip"),
        SurfaceMessage::Frame { frame } => {
            tracing::debug!(labels = frame.labels.len(), "Frame");
            *latest = Some(Arc::clone(frame));
        }
        SurfaceMessage::NowPlaying { clip } => info!(clip = ?clip, "Voice guidance"),
        SurfaceMessage::Connection { state } => match state {
            ConnectionState::Connected => info!("Connected"),
            ConnectionState::Closed { reason: None } => info!("Connection closed"),
            ConnectionState::Closed {
                reason: Some(reason),
            } => warn!(%reason, "Connection lost"),
        },
    }
}
