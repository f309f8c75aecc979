//! Playback engine contract and its implementations

mod decoder;
pub mod engine;
mod error;
pub mod progress;
pub mod scripted;
mod stream_wrapper;
mod symphonia_engine;

pub use decoder::{DecodeOutcome, SymphoniaDecoder};
pub use engine::*;
pub use error::*;
pub use progress::{PlaybackProgressInfo, SharedProgress};
pub use scripted::{ResourceCall, ScriptedEngine};
pub use stream_wrapper::BufferedRemoteSource;
pub use symphonia_engine::{MediaLocation, SymphoniaEngine};
