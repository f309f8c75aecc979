//! Application settings and configuration management

use crate::focus::DEFAULT_DUCK_VOLUME;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const LOG_TARGET: &str = "r_focusplay::config";

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Directory scanned for playable media
    #[serde(default)]
    pub media_dir: Option<PathBuf>,
    /// Output gain while another client holds duckable focus
    #[serde(default = "default_duck_volume")]
    pub duck_volume: f32,
    /// How often position updates are broadcast while playing
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    /// Capacity of the state update broadcast channel
    #[serde(default = "default_state_update_capacity")]
    pub state_update_capacity: usize,
    /// Tracing filter used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_duck_volume() -> f32 {
    DEFAULT_DUCK_VOLUME
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_state_update_capacity() -> usize {
    32
}

fn default_log_filter() -> String {
    "r_focusplay=info".to_string()
}

/// Why a configuration file could not be used
#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    ParseError(String),
    ValidationError(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(format!("line {} column {}: {}", err.line(), err.column(), err))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "cannot access config file: {}", e),
            ConfigError::ParseError(s) => write!(f, "malformed config file ({})", s),
            ConfigError::ValidationError(s) => write!(f, "invalid setting: {}", s),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            media_dir: None,
            duck_volume: default_duck_volume(),
            progress_interval_ms: default_progress_interval_ms(),
            state_update_capacity: default_state_update_capacity(),
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Load settings from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(target: LOG_TARGET, path = %path.display(), "No config file, using defaults.");
            return Ok(Self::default());
        }

        let settings = serde_json::from_str::<Settings>(&fs::read_to_string(path)?)?;
        debug!(target: LOG_TARGET, path = %path.display(), ?settings, "Config file read.");
        Ok(settings)
    }

    /// Writes pretty-printed JSON, creating missing parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `~/.config/focusplay/config.json`, relative to the working directory when there is no home.
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("focusplay").join("config.json")
    }

    /// Rejects values the player cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.duck_volume) {
            return Err(ConfigError::ValidationError(format!(
                "duck_volume must be within [0.0, 1.0], got {}",
                self.duck_volume
            )));
        }

        if self.progress_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "progress_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.state_update_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "state_update_capacity must be greater than zero".to_string(),
            ));
        }

        if let Some(dir) = &self.media_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(ConfigError::ValidationError(format!(
                    "media_dir {} is not a directory",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}
