//! TOML-based configuration persistence for SBManager.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\SBManager\config.toml`
//! - Linux:    `~/.config/sbmanager/config.toml`
//! - macOS:    `~/Library/Application Support/SBManager/config.toml`
//!
//! # What is TOML? (for beginners)
//!
//! TOML is a configuration file format designed to be easy to read and write.
//! It looks similar to INI files but with real data types.  Example:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [device]
//! offline_root = "/home/me/devices"
//!
//! [stage]
//! page_switch_dwell_ms = 800
//! ```
//!
//! `serde` converts between these files and the Rust structs below.
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "some_fn")]` (or `#[serde(default)]`
//! for whole sections), so an absent file, an absent section, or a file from
//! an older release all load without error.

use std::path::PathBuf;
use std::time::Duration;

use sbm_core::domain::geometry::{DEFAULT_DOCK_HEIGHT, DEFAULT_STAGE_HEIGHT, DEFAULT_STAGE_WIDTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session::StageDimensions;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub stage: StageConfig,
}

/// General behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Schema version string; bump when breaking changes are introduced.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where fetched images are cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Overrides the platform cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

/// Device backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Directory served by the offline device backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_root: Option<PathBuf>,
    /// How often the front end polls icon-loading progress.
    #[serde(default = "default_icon_poll_interval_ms")]
    pub icon_poll_interval_ms: u64,
    /// Battery refresh period used when the device does not report one.
    #[serde(default = "default_battery_poll_interval_secs")]
    pub battery_poll_interval_secs: u64,
}

/// Replica home screen dimensions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageConfig {
    #[serde(default = "default_stage_width")]
    pub width: f32,
    #[serde(default = "default_stage_height")]
    pub height: f32,
    #[serde(default = "default_dock_height")]
    pub dock_height: f32,
    /// Dwell time in a page-edge trigger zone before the page switches.
    #[serde(default = "default_page_switch_dwell_ms")]
    pub page_switch_dwell_ms: u64,
}

impl StageConfig {
    /// Stage size and dwell as the session controller takes them.
    pub fn dimensions(&self) -> StageDimensions {
        StageDimensions {
            width: self.width,
            height: self.height,
            dock_height: self.dock_height,
            page_switch_dwell: Duration::from_millis(self.page_switch_dwell_ms),
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_icon_poll_interval_ms() -> u64 {
    100
}
fn default_battery_poll_interval_secs() -> u64 {
    60
}
fn default_stage_width() -> f32 {
    DEFAULT_STAGE_WIDTH
}
fn default_stage_height() -> f32 {
    DEFAULT_STAGE_HEIGHT
}
fn default_dock_height() -> f32 {
    DEFAULT_DOCK_HEIGHT
}
fn default_page_switch_dwell_ms() -> u64 {
    1000
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            offline_root: None,
            icon_poll_interval_ms: default_icon_poll_interval_ms(),
            battery_poll_interval_secs: default_battery_poll_interval_secs(),
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: default_stage_width(),
            height: default_stage_height(),
            dock_height: default_dock_height(),
            page_switch_dwell_ms: default_page_switch_dwell_ms(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from disk, returning `AppConfig::default()` if the file
/// does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from an explicit path (defaults if it does not exist).
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_from(path: &std::path::Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to disk.
///
/// Creates the config directory and file if they do not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to an explicit path, creating parent directories.
///
/// # Errors
///
/// Same as [`save_config`].
pub fn save_config_to(config: &AppConfig, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("SBManager"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("sbmanager"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("SBManager"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
