use crate::audio::{AudioError, EngineError};
use std::error::Error;
use std::fmt;

/// Failures surfaced to the client of the player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// The locator could not be opened; the load was aborted.
    SourceUnavailable { locator: String, reason: String },
    /// The arbiter refused focus; nothing was loaded.
    FocusDenied,
    /// The operation needs a playback resource and none exists.
    NoActiveResource,
    /// The engine reported a fault; the resource was discarded.
    Engine(EngineError),
    /// The player has shut down.
    Terminated,
}

impl PlayerError {
    pub(crate) fn from_audio(locator: &str, err: AudioError) -> Self {
        match err {
            AudioError::Engine(e) => PlayerError::Engine(e),
            AudioError::SourceUnavailable(reason) => PlayerError::SourceUnavailable {
                locator: locator.to_string(),
                reason,
            },
            other => PlayerError::SourceUnavailable {
                locator: locator.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::SourceUnavailable { locator, reason } => {
                write!(f, "Source unavailable: {} ({})", locator, reason)
            }
            PlayerError::FocusDenied => write!(f, "Audio focus denied"),
            PlayerError::NoActiveResource => write!(f, "No active playback resource"),
            PlayerError::Engine(e) => write!(f, "Engine error: {}", e),
            PlayerError::Terminated => write!(f, "Player has terminated"),
        }
    }
}

impl Error for PlayerError {}

impl From<EngineError> for PlayerError {
    fn from(e: EngineError) -> Self {
        PlayerError::Engine(e)
    }
}
