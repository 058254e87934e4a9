//! TOML Configuration File Support
//!
//! Loads the monitor configuration from `~/.config/actionq/monitor.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [transport]
//! url = "ws://localhost:8765"
//! connect_timeout_ms = 5000
//!
//! [assets]
//! root = "exercises1"
//!
//! [audio]
//! enabled = true
//! cooldown_ms = 2000
//! silent_clip_ms = 1500
//!
//! [overlay]
//! width = 640
//! height = 480
//!
//! [ui]
//! transition_delay_ms = 500
//! notification_ms = 2000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::DEFAULT_ASSET_ROOT;
use crate::audio::{DEFAULT_COOLDOWN, DEFAULT_SILENT_CLIP};
use crate::overlay::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::transport::DEFAULT_URL;

/// Delay between an exercise starting and its reference clip playing
pub const DEFAULT_TRANSITION_DELAY: Duration = Duration::from_millis(500);

/// How long a notification stays on screen
pub const DEFAULT_NOTIFICATION: Duration = Duration::from_millis(2000);

/// Default handshake timeout
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Transport section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Session server URL
    pub url: Option<String>,

    /// Handshake timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

/// Assets section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsToml {
    /// Directory holding one folder per exercise
    pub root: Option<PathBuf>,
}

/// Audio section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioToml {
    /// Whether voice guidance plays at all
    pub enabled: Option<bool>,

    /// Minimum gap between two clip starts, in milliseconds
    pub cooldown_ms: Option<u64>,

    /// Length the silent player pretends each clip lasts, in milliseconds
    pub silent_clip_ms: Option<u64>,
}

/// Overlay section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayToml {
    /// Drawing surface width
    pub width: Option<u32>,

    /// Drawing surface height
    pub height: Option<u32>,
}

/// UI section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiToml {
    /// Delay before the reference clip plays, in milliseconds
    pub transition_delay_ms: Option<u64>,

    /// Notification lifetime, in milliseconds
    pub notification_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorToml {
    /// Transport configuration section
    pub transport: TransportToml,

    /// Assets configuration section
    pub assets: AssetsToml,

    /// Audio configuration section
    pub audio: AudioToml,

    /// Overlay configuration section
    pub overlay: OverlayToml,

    /// UI configuration section
    pub ui: UiToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for the monitor
///
/// Use [`load_config`] to load it with proper priority handling, then
/// [`MonitorConfig::validate`] once CLI overrides are applied.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Session server URL
    pub url: String,

    /// Handshake timeout
    pub connect_timeout: Duration,

    /// Exercise asset root
    pub asset_root: PathBuf,

    /// Whether voice guidance plays
    pub audio_enabled: bool,

    /// Minimum gap between two clip starts
    pub audio_cooldown: Duration,

    /// Clip length assumed by the silent player
    pub silent_clip: Duration,

    /// Overlay surface width
    pub overlay_width: u32,

    /// Overlay surface height
    pub overlay_height: u32,

    /// Delay before the reference clip plays
    pub transition_delay: Duration,

    /// Notification lifetime
    pub notification: Duration,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            asset_root: PathBuf::from(DEFAULT_ASSET_ROOT),
            audio_enabled: true,
            audio_cooldown: DEFAULT_COOLDOWN,
            silent_clip: DEFAULT_SILENT_CLIP,
            overlay_width: DEFAULT_WIDTH,
            overlay_height: DEFAULT_HEIGHT,
            transition_delay: DEFAULT_TRANSITION_DELAY,
            notification: DEFAULT_NOTIFICATION,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl MonitorConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Reject values the monitor cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an empty URL or a
    /// zero-sized overlay surface.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "transport.url must not be empty".to_string(),
            ));
        }
        if self.overlay_width == 0 || self.overlay_height == 0 {
            return Err(ConfigError::ValidationError(format!(
                "overlay surface must not be empty, got {}x{}",
                self.overlay_width, self.overlay_height
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/actionq/monitor.toml` or
/// `~/.config/actionq/monitor.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("actionq").join("monitor.toml"))
}

/// Load configuration from the default path, then the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<MonitorConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<MonitorConfig, ConfigError> {
    let mut config = MonitorConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: MonitorToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut MonitorConfig, toml: &MonitorToml) {
    if let Some(ref url) = toml.transport.url {
        config.url.clone_from(url);
    }
    if let Some(ms) = toml.transport.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }

    if let Some(ref root) = toml.assets.root {
        config.asset_root.clone_from(root);
    }

    if let Some(enabled) = toml.audio.enabled {
        config.audio_enabled = enabled;
    }
    if let Some(ms) = toml.audio.cooldown_ms {
        config.audio_cooldown = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.audio.silent_clip_ms {
        config.silent_clip = Duration::from_millis(ms);
    }

    if let Some(width) = toml.overlay.width {
        config.overlay_width = width;
    }
    if let Some(height) = toml.overlay.height {
        config.overlay_height = height;
    }

    if let Some(ms) = toml.ui.transition_delay_ms {
        config.transition_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.ui.notification_ms {
        config.notification = Duration::from_millis(ms);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut MonitorConfig) {
    if let Ok(url) = std::env::var("ACTIONQ_URL") {
        config.url = url;
        config.source = ConfigSource::Env;
    }
    if let Ok(root) = std::env::var("ACTIONQ_ASSETS") {
        config.asset_root = PathBuf::from(root);
        config.source = ConfigSource::Env;
    }
    if let Ok(enabled) = std::env::var("ACTIONQ_AUDIO") {
        config.audio_enabled = enabled != "0" && enabled.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Ok(cooldown) = std::env::var("ACTIONQ_COOLDOWN_MS") {
        if let Ok(ms) = cooldown.parse::<u64>() {
            config.audio_cooldown = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Server URL override
    pub url: Option<String>,

    /// Asset root override
    pub asset_root: Option<PathBuf>,

    /// Audio enabled override
    pub audio_enabled: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server URL override
    #[must_use]
    pub fn with_url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    /// Set asset root override
    #[must_use]
    pub fn with_asset_root(mut self, root: PathBuf) -> Self {
        self.asset_root = Some(root);
        self
    }

    /// Set audio enabled override
    #[must_use]
    pub fn with_audio_enabled(mut self, enabled: bool) -> Self {
        self.audio_enabled = Some(enabled);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut MonitorConfig) {
        if self.url.is_some() || self.asset_root.is_some() || self.audio_enabled.is_some() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.url {
            config.url.clone_from(url);
        }
        if let Some(ref root) = self.asset_root {
            config.asset_root.clone_from(root);
        }
        if let Some(enabled) = self.audio_enabled {
            config.audio_enabled = enabled;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
