use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::audio::engine::Volume;

/// Holds the current playback progress of one resource.
#[derive(Debug, Default, Clone)]
pub struct PlaybackProgressInfo {
    pub position: Duration,
    pub total: Option<Duration>,
    pub playing: bool,
    pub volume: Volume,
}

// Type alias for the shared progress tracker
pub type SharedProgress = Arc<Mutex<PlaybackProgressInfo>>;

pub fn new_shared_progress() -> SharedProgress {
    Arc::new(Mutex::new(PlaybackProgressInfo::default()))
}

/// Locks the tracker, recovering the data if a render thread panicked while holding it.
pub fn lock_progress(progress: &SharedProgress) -> MutexGuard<'_, PlaybackProgressInfo> {
    progress.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
