// src/player/session.rs
use super::{PlayerError, SessionState, PLAYER_LOG_TARGET};
use crate::audio::{
    EngineError, EngineEvent, EngineListener, PlaybackEngine, PlaybackResource, ResourceId, StreamCategory, Volume,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, trace, warn};

/// What the owning unit should do after the session handled an event.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    /// The resource reached a terminal event and the unit should tear itself down.
    Terminate,
}

/// The live resource and everything scoped to it.
struct ActiveResource {
    id: ResourceId,
    locator: String,
    handle: Box<dyn PlaybackResource>,
    // Set once the engine reported `prepared` for the current prepare cycle.
    prepared: bool,
    resume_position: Option<Duration>,
    volume: Volume,
}

/// Owns at most one playback resource and drives it through
/// `Idle -> Loading -> Playing <-> Paused`, with `Stopped` for a halted but unreleased resource.
///
/// Engine callbacks are honoured only when they carry the id of the current resource.
pub struct PlaybackSession {
    engine: Arc<dyn PlaybackEngine>,
    listener: EngineListener,
    next_resource_id: u64,
    active: Option<ActiveResource>,
    state: SessionState,
    last_locator: Option<String>,
    fault: Option<EngineError>,
}

impl PlaybackSession {
    pub fn new(engine: Arc<dyn PlaybackEngine>, listener: EngineListener) -> Self {
        PlaybackSession {
            engine,
            listener,
            next_resource_id: 1,
            active: None,
            state: SessionState::Idle,
            last_locator: None,
            fault: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn has_resource(&self) -> bool {
        self.active.is_some()
    }

    pub fn resource_id(&self) -> Option<ResourceId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Locator of the live resource, or of the last one loaded.
    pub fn locator(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|a| a.locator.as_str())
            .or(self.last_locator.as_deref())
    }

    pub fn is_outputting(&self) -> bool {
        self.state == SessionState::Playing && self.active.as_ref().is_some_and(|a| a.handle.is_playing())
    }

    pub fn position(&self) -> Duration {
        self.active.as_ref().map(|a| a.handle.current_position()).unwrap_or_default()
    }

    pub fn resume_position(&self) -> Option<Duration> {
        self.active.as_ref().and_then(|a| a.resume_position)
    }

    pub fn volume(&self) -> Option<Volume> {
        self.active.as_ref().map(|a| a.volume)
    }

    /// The engine fault that most recently cost the session its resource, if not yet collected.
    pub fn take_fault(&mut self) -> Option<EngineError> {
        self.fault.take()
    }

    /// Creates a fresh resource for `locator` and starts preparing it. Any existing resource is
    /// released first.
    #[instrument(skip(self), fields(state = ?self.state))]
    pub fn load(&mut self, locator: &str) -> Result<(), PlayerError> {
        self.release();
        self.last_locator = Some(locator.to_string());

        let id = ResourceId(self.next_resource_id);
        self.next_resource_id += 1;
        info!(target: PLAYER_LOG_TARGET, %id, locator, "Loading media.");

        let mut handle = self.engine.create_resource(id, self.listener.clone());
        handle.set_output_category(StreamCategory::Music);
        let bound = handle.set_source(locator).and_then(|_| handle.prepare_async());
        if let Err(e) = bound {
            warn!(target: PLAYER_LOG_TARGET, %id, "Load failed, releasing half-built resource: {}", e);
            handle.release();
            self.state = SessionState::Idle;
            return Err(PlayerError::from_audio(locator, e));
        }

        self.active = Some(ActiveResource {
            id,
            locator: locator.to_string(),
            handle,
            prepared: false,
            resume_position: None,
            volume: Volume::FULL,
        });
        self.state = SessionState::Loading;
        Ok(())
    }

    /// Loads the most recently requested locator again.
    pub fn reload(&mut self) -> Result<(), PlayerError> {
        match self.last_locator.clone() {
            Some(locator) => self.load(&locator),
            None => {
                debug!(target: PLAYER_LOG_TARGET, "Reload requested but nothing was ever loaded.");
                Ok(())
            }
        }
    }

    /// Starts or resumes output from the stored resume position.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        let active = self.active.as_mut().ok_or(PlayerError::NoActiveResource)?;
        match self.state {
            SessionState::Playing | SessionState::Loading => Ok(()),
            SessionState::Paused if !active.prepared => {
                // Paused before the engine finished preparing; `prepared` will start output.
                debug!(target: PLAYER_LOG_TARGET, id = %active.id, "Resume before prepared, waiting for engine.");
                self.state = SessionState::Loading;
                Ok(())
            }
            SessionState::Paused => {
                let from = active.resume_position.take().unwrap_or_default();
                let started = active.handle.seek_to(from).and_then(|_| active.handle.start());
                if let Err(e) = started {
                    error!(target: PLAYER_LOG_TARGET, id = %active.id, "Resume failed: {}", e);
                    let err = e.to_engine_error();
                    self.stop_and_release();
                    return Err(PlayerError::Engine(err));
                }
                info!(target: PLAYER_LOG_TARGET, id = %active.id, ?from, "Playback resumed.");
                self.state = SessionState::Playing;
                Ok(())
            }
            SessionState::Stopped => {
                // A stopped resource has to be prepared again before it can start.
                if let Err(e) = active.handle.prepare_async() {
                    error!(target: PLAYER_LOG_TARGET, id = %active.id, "Re-prepare failed: {}", e);
                    let err = e.to_engine_error();
                    self.release();
                    return Err(PlayerError::Engine(err));
                }
                active.prepared = false;
                debug!(target: PLAYER_LOG_TARGET, id = %active.id, "Re-preparing stopped resource.");
                self.state = SessionState::Loading;
                Ok(())
            }
            SessionState::Idle => Err(PlayerError::NoActiveResource),
        }
    }

    pub fn resume(&mut self) -> Result<(), PlayerError> {
        self.play()
    }

    /// Halts output and records the position to resume from. While loading it only keeps the
    /// upcoming `prepared` from starting output.
    pub fn pause(&mut self) {
        if self.state == SessionState::Loading {
            if let Some(active) = self.active.as_mut() {
                active.resume_position = None;
                info!(target: PLAYER_LOG_TARGET, id = %active.id, "Paused while loading.");
                self.state = SessionState::Paused;
            }
            return;
        }
        if self.state != SessionState::Playing {
            return;
        }
        if let Some(active) = self.active.as_mut() {
            if let Err(e) = active.handle.pause() {
                warn!(target: PLAYER_LOG_TARGET, id = %active.id, "Engine refused pause: {}", e);
                return;
            }
            let position = active.handle.current_position();
            active.resume_position = Some(position);
            info!(target: PLAYER_LOG_TARGET, id = %active.id, ?position, "Playback paused.");
            self.state = SessionState::Paused;
        }
    }

    /// Halts output, or an in-flight prepare, without releasing the resource.
    pub fn stop(&mut self) {
        if !matches!(self.state, SessionState::Playing | SessionState::Loading) {
            return;
        }
        if let Some(active) = self.active.as_mut() {
            if let Err(e) = active.handle.stop() {
                warn!(target: PLAYER_LOG_TARGET, id = %active.id, "Engine refused stop: {}", e);
            }
            active.prepared = false;
            active.resume_position = None;
            info!(target: PLAYER_LOG_TARGET, id = %active.id, "Playback stopped.");
            self.state = SessionState::Stopped;
        }
    }

    /// Releases the resource if one exists. Safe to call in any state.
    pub fn release(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handle.release();
            info!(target: PLAYER_LOG_TARGET, id = %active.id, "Resource released.");
        }
        self.state = SessionState::Idle;
    }

    pub fn set_volume(&mut self, volume: Volume) {
        if let Some(active) = self.active.as_mut() {
            match active.handle.set_volume(volume) {
                Ok(()) => active.volume = volume,
                Err(e) => warn!(target: PLAYER_LOG_TARGET, id = %active.id, "Engine refused volume change: {}", e),
            }
        }
    }

    /// Routes an engine callback. Callbacks from any resource other than the current one are
    /// discarded.
    pub fn handle_engine_event(&mut self, resource: ResourceId, event: EngineEvent) -> Disposition {
        if self.resource_id() != Some(resource) {
            trace!(target: PLAYER_LOG_TARGET, %resource, ?event, current = ?self.resource_id(), "Discarding stale callback.");
            return Disposition::Continue;
        }
        match event {
            EngineEvent::Prepared => self.on_prepared(),
            // A halted resource has no render worker left to finish or fail.
            EngineEvent::Completed | EngineEvent::Error(_) if self.state == SessionState::Stopped => {
                debug!(target: PLAYER_LOG_TARGET, %resource, ?event, "Ignoring terminal event for stopped resource.");
                Disposition::Continue
            }
            EngineEvent::Completed => self.on_completed(),
            EngineEvent::Error(err) => self.on_error(err),
            EngineEvent::BufferingUpdate(percent) => {
                trace!(target: PLAYER_LOG_TARGET, %resource, percent, "Buffering update.");
                Disposition::Continue
            }
            EngineEvent::SeekComplete => {
                trace!(target: PLAYER_LOG_TARGET, %resource, "Seek complete.");
                Disposition::Continue
            }
            EngineEvent::Info { what, extra } => {
                debug!(target: PLAYER_LOG_TARGET, %resource, what, extra, "Engine info.");
                Disposition::Continue
            }
        }
    }

    fn on_prepared(&mut self) -> Disposition {
        let Some(active) = self.active.as_mut() else {
            return Disposition::Continue;
        };
        match self.state {
            SessionState::Loading => {}
            SessionState::Paused if !active.prepared => {
                active.prepared = true;
                debug!(target: PLAYER_LOG_TARGET, id = %active.id, "Prepared while paused, holding output.");
                return Disposition::Continue;
            }
            state => {
                trace!(target: PLAYER_LOG_TARGET, ?state, "Ignoring prepared outside Loading.");
                return Disposition::Continue;
            }
        }
        active.prepared = true;
        if let Err(e) = active.handle.start() {
            let err = e.to_engine_error();
            error!(target: PLAYER_LOG_TARGET, id = %active.id, "Start after prepare failed: {}", e);
            return self.on_error(err);
        }
        info!(target: PLAYER_LOG_TARGET, id = %active.id, locator = %active.locator, "Playback started.");
        self.state = SessionState::Playing;
        Disposition::Continue
    }

    fn on_completed(&mut self) -> Disposition {
        info!(target: PLAYER_LOG_TARGET, id = ?self.resource_id(), "Playback completed.");
        self.stop_and_release();
        Disposition::Terminate
    }

    fn on_error(&mut self, err: EngineError) -> Disposition {
        error!(
            target: PLAYER_LOG_TARGET,
            id = ?self.resource_id(),
            what = err.what(),
            extra = err.extra,
            "Engine error, discarding resource: {}",
            err
        );
        self.fault = Some(err);
        self.stop_and_release();
        Disposition::Terminate
    }

    fn stop_and_release(&mut self) {
        self.stop();
        self.release();
    }
}
