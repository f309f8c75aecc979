use std::error::Error;
use std::fmt;
use std::io;
use symphonia::core::errors::Error as SymphoniaError;

/// Top-level engine error codes, as reported through the `error` callback.
pub const MEDIA_ERROR_UNKNOWN: i32 = 1;
pub const MEDIA_ERROR_SERVER_DIED: i32 = 100;
pub const MEDIA_ERROR_NOT_VALID_FOR_PROGRESSIVE_PLAYBACK: i32 = 200;

/// Secondary ("extra") codes qualifying an engine error.
pub const MEDIA_ERROR_IO: i32 = -1004;
pub const MEDIA_ERROR_MALFORMED: i32 = -1007;
pub const MEDIA_ERROR_UNSUPPORTED: i32 = -1010;
pub const MEDIA_ERROR_TIMED_OUT: i32 = -110;

/// Classification of the primary engine error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Unknown,
    ServerDied,
    NotValidForProgressivePlayback,
    Other(i32),
}

impl EngineErrorKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            MEDIA_ERROR_UNKNOWN => EngineErrorKind::Unknown,
            MEDIA_ERROR_SERVER_DIED => EngineErrorKind::ServerDied,
            MEDIA_ERROR_NOT_VALID_FOR_PROGRESSIVE_PLAYBACK => EngineErrorKind::NotValidForProgressivePlayback,
            other => EngineErrorKind::Other(other),
        }
    }

    /// The raw code this kind was built from.
    pub fn code(&self) -> i32 {
        match self {
            EngineErrorKind::Unknown => MEDIA_ERROR_UNKNOWN,
            EngineErrorKind::ServerDied => MEDIA_ERROR_SERVER_DIED,
            EngineErrorKind::NotValidForProgressivePlayback => MEDIA_ERROR_NOT_VALID_FOR_PROGRESSIVE_PLAYBACK,
            EngineErrorKind::Other(code) => *code,
        }
    }
}

/// An asynchronous fault reported by the engine. Both raw codes are preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub extra: i32,
}

impl EngineError {
    pub fn new(what: i32, extra: i32) -> Self {
        EngineError { kind: EngineErrorKind::from_code(what), extra }
    }

    pub fn what(&self) -> i32 {
        self.kind.code()
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EngineErrorKind::Unknown => write!(f, "media error unknown (extra {})", self.extra),
            EngineErrorKind::ServerDied => write!(f, "media server died (extra {})", self.extra),
            EngineErrorKind::NotValidForProgressivePlayback => {
                write!(f, "media not valid for progressive playback (extra {})", self.extra)
            }
            EngineErrorKind::Other(code) => write!(f, "media error {} (extra {})", code, self.extra),
        }
    }
}

impl Error for EngineError {}

/// Error types specific to the playback engine layer.
#[derive(Debug)]
pub enum AudioError {
    SourceUnavailable(String),
    InvalidState(String),
    SymphoniaError(SymphoniaError),
    IoError(io::Error),
    NetworkError(reqwest::Error),
    UnsupportedFormat(String),
    Engine(EngineError),
    TaskJoinError(String),
}

impl AudioError {
    /// Maps this error onto the engine's `(what, extra)` callback codes.
    pub fn to_engine_error(&self) -> EngineError {
        match self {
            AudioError::Engine(e) => *e,
            AudioError::SourceUnavailable(_) | AudioError::IoError(_) => {
                EngineError::new(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_IO)
            }
            AudioError::NetworkError(e) if e.is_timeout() => {
                EngineError::new(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_TIMED_OUT)
            }
            AudioError::NetworkError(_) => EngineError::new(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_IO),
            AudioError::UnsupportedFormat(_) => {
                EngineError::new(MEDIA_ERROR_NOT_VALID_FOR_PROGRESSIVE_PLAYBACK, MEDIA_ERROR_UNSUPPORTED)
            }
            AudioError::SymphoniaError(SymphoniaError::IoError(_)) => {
                EngineError::new(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_IO)
            }
            AudioError::SymphoniaError(SymphoniaError::Unsupported(_)) => {
                EngineError::new(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_UNSUPPORTED)
            }
            AudioError::SymphoniaError(_) => EngineError::new(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_MALFORMED),
            AudioError::InvalidState(_) | AudioError::TaskJoinError(_) => {
                EngineError::new(MEDIA_ERROR_SERVER_DIED, 0)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::SourceUnavailable(s) => write!(f, "Source unavailable: {}", s),
            AudioError::InvalidState(s) => write!(f, "Invalid state: {}", s),
            AudioError::SymphoniaError(e) => write!(f, "Symphonia error: {}", e),
            AudioError::IoError(e) => write!(f, "I/O error: {}", e),
            AudioError::NetworkError(e) => write!(f, "Network error: {}", e),
            AudioError::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
            AudioError::Engine(e) => write!(f, "Engine error: {}", e),
            AudioError::TaskJoinError(e) => write!(f, "Async task join error: {}", e),
        }
    }
}

impl Error for AudioError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AudioError::SymphoniaError(e) => Some(e),
            AudioError::IoError(e) => Some(e),
            AudioError::NetworkError(e) => Some(e),
            AudioError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

// --- From Implementations for AudioError ---

impl From<SymphoniaError> for AudioError {
    fn from(e: SymphoniaError) -> Self {
        AudioError::SymphoniaError(e)
    }
}

impl From<io::Error> for AudioError {
    fn from(e: io::Error) -> Self {
        AudioError::IoError(e)
    }
}

impl From<reqwest::Error> for AudioError {
    fn from(e: reqwest::Error) -> Self {
        AudioError::NetworkError(e)
    }
}

impl From<tokio::task::JoinError> for AudioError {
    fn from(e: tokio::task::JoinError) -> Self {
        AudioError::TaskJoinError(e.to_string())
    }
}

impl From<EngineError> for AudioError {
    fn from(e: EngineError) -> Self {
        AudioError::Engine(e)
    }
}
