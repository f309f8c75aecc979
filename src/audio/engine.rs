// src/audio/engine.rs
use crate::audio::error::{AudioError, EngineError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identity of one playback resource instance.
///
/// Ids are never reused within a session, so a callback tagged with an old id can always be
/// told apart from one produced by the current resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Lifecycle callbacks delivered asynchronously by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Prepared,
    Completed,
    Error(EngineError),
    BufferingUpdate(u8),
    SeekComplete,
    Info { what: i32, extra: i32 },
}

/// Callback registered on a resource at creation. Invoked from any thread.
pub type EngineListener = Arc<dyn Fn(ResourceId, EngineEvent) + Send + Sync + 'static>;

/// Output stream category a resource is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCategory {
    Music,
    Notification,
}

/// Left/right output gain, each clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    pub left: f32,
    pub right: f32,
}

impl Volume {
    pub const FULL: Volume = Volume { left: 1.0, right: 1.0 };

    pub fn new(left: f32, right: f32) -> Self {
        Volume { left: left.clamp(0.0, 1.0), right: right.clamp(0.0, 1.0) }
    }

    /// Same gain on both channels.
    pub fn uniform(gain: f32) -> Self {
        Volume::new(gain, gain)
    }

    pub fn is_full(&self) -> bool {
        *self == Volume::FULL
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume::FULL
    }
}

/// Transport controls of one decoding/rendering engine instance.
///
/// Contract: `set_source` then `prepare_async`, which later delivers exactly one of
/// `Prepared` or `Error` to the listener. Once prepared the transport methods are valid.
/// `release` is terminal; the handle must not be used afterwards.
pub trait PlaybackResource: Send {
    fn set_output_category(&mut self, category: StreamCategory);

    /// Binds the resource to a locator. Fails with `AudioError::SourceUnavailable` on a bad
    /// locator or I/O error.
    fn set_source(&mut self, locator: &str) -> Result<(), AudioError>;

    /// Starts preparing in the background. Completion is reported through the listener.
    fn prepare_async(&mut self) -> Result<(), AudioError>;

    fn start(&mut self) -> Result<(), AudioError>;

    fn pause(&mut self) -> Result<(), AudioError>;

    fn seek_to(&mut self, position: Duration) -> Result<(), AudioError>;

    /// Halts output. The resource must be prepared again before the next `start`.
    fn stop(&mut self) -> Result<(), AudioError>;

    fn set_volume(&mut self, volume: Volume) -> Result<(), AudioError>;

    fn is_playing(&self) -> bool;

    fn current_position(&self) -> Duration;

    fn release(&mut self);
}

/// Factory for playback resources.
pub trait PlaybackEngine: Send + Sync {
    /// Creates a fresh resource that reports its callbacks to `listener`.
    fn create_resource(&self, id: ResourceId, listener: EngineListener) -> Box<dyn PlaybackResource>;
}
