//! Deterministic engine whose callbacks are driven by the caller.
//!
//! Every transport call is recorded per resource, positions are set explicitly (or follow a
//! wall clock when enabled), and any callback can be emitted for any resource id, including
//! ids that were already released.

use crate::audio::engine::{
    EngineEvent, EngineListener, PlaybackEngine, PlaybackResource, ResourceId, StreamCategory, Volume,
};
use crate::audio::error::{AudioError, EngineError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const LOG_TARGET: &str = "r_focusplay::audio::scripted";

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceCall {
    SetOutputCategory(StreamCategory),
    SetSource(String),
    PrepareAsync,
    Start,
    Pause,
    SeekTo(Duration),
    Stop,
    SetVolume(Volume),
    Release,
}

struct ResourceRecord {
    listener: EngineListener,
    locator: Option<String>,
    calls: Vec<ResourceCall>,
    prepared: bool,
    playing: bool,
    position_base: Duration,
    started_at: Option<Instant>,
    volume: Volume,
    release_count: usize,
    play_epoch: u64,
}

impl ResourceRecord {
    fn position(&self) -> Duration {
        match self.started_at {
            Some(at) => self.position_base + at.elapsed(),
            None => self.position_base,
        }
    }
}

#[derive(Default)]
struct ScriptedInner {
    resources: BTreeMap<ResourceId, ResourceRecord>,
    auto_prepare: bool,
    realtime: bool,
    track_length: Option<Duration>,
    unavailable: HashSet<String>,
    prepare_failures: HashMap<String, EngineError>,
    start_failures: HashMap<String, EngineError>,
}

/// Scripted engine. Clones share the same recorded state.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    inner: Arc<Mutex<ScriptedInner>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `Prepared` as soon as `prepare_async` is called.
    pub fn with_auto_prepare(self) -> Self {
        self.lock().auto_prepare = true;
        self
    }

    /// Advance positions with wall-clock time while started.
    pub fn with_realtime_clock(self) -> Self {
        self.lock().realtime = true;
        self
    }

    /// Deliver `Completed` once a started resource reaches `length`. Needs the realtime clock
    /// and a Tokio runtime.
    pub fn with_track_length(self, length: Duration) -> Self {
        self.lock().track_length = Some(length);
        self
    }

    /// `set_source` with this locator fails with `SourceUnavailable`.
    pub fn mark_unavailable(&self, locator: &str) {
        self.lock().unavailable.insert(locator.to_string());
    }

    /// With auto-prepare enabled, preparing this locator delivers `error` instead of `prepared`.
    pub fn fail_prepare(&self, locator: &str, error: EngineError) {
        self.lock().prepare_failures.insert(locator.to_string(), error);
    }

    /// `start` on a resource bound to this locator fails with `error`.
    pub fn fail_start(&self, locator: &str, error: EngineError) {
        self.lock().start_failures.insert(locator.to_string(), error);
    }

    pub fn created_count(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.lock().resources.keys().copied().collect()
    }

    pub fn latest(&self) -> Option<ResourceId> {
        self.lock().resources.keys().next_back().copied()
    }

    /// Resources created but not yet released.
    pub fn live_resources(&self) -> Vec<ResourceId> {
        self.lock()
            .resources
            .iter()
            .filter(|(_, r)| r.release_count == 0)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn release_count(&self, id: ResourceId) -> usize {
        self.lock().resources.get(&id).map(|r| r.release_count).unwrap_or(0)
    }

    pub fn calls(&self, id: ResourceId) -> Vec<ResourceCall> {
        self.lock().resources.get(&id).map(|r| r.calls.clone()).unwrap_or_default()
    }

    pub fn locator(&self, id: ResourceId) -> Option<String> {
        self.lock().resources.get(&id).and_then(|r| r.locator.clone())
    }

    pub fn is_playing(&self, id: ResourceId) -> bool {
        self.lock().resources.get(&id).map(|r| r.playing).unwrap_or(false)
    }

    pub fn volume(&self, id: ResourceId) -> Option<Volume> {
        self.lock().resources.get(&id).map(|r| r.volume)
    }

    pub fn position(&self, id: ResourceId) -> Option<Duration> {
        self.lock().resources.get(&id).map(|r| r.position())
    }

    pub fn set_position(&self, id: ResourceId, position: Duration) {
        if let Some(record) = self.lock().resources.get_mut(&id) {
            record.position_base = position;
            if record.started_at.is_some() {
                record.started_at = Some(Instant::now());
            }
        }
    }

    /// Delivers `event` through the listener registered for `id`. Returns false for an unknown id.
    pub fn emit(&self, id: ResourceId, event: EngineEvent) -> bool {
        let listener = {
            let mut inner = self.lock();
            match inner.resources.get_mut(&id) {
                Some(record) => {
                    if event == EngineEvent::Prepared {
                        record.prepared = true;
                    }
                    record.listener.clone()
                }
                None => return false,
            }
        };
        trace!(target: LOG_TARGET, %id, ?event, "Emitting scripted callback.");
        listener(id, event);
        true
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn schedule_completion(&self, id: ResourceId, epoch: u64, remaining: Duration) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => return,
        };
        let engine = self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(remaining).await;
            let still_running = engine
                .lock()
                .resources
                .get(&id)
                .map(|r| r.playing && r.play_epoch == epoch && r.release_count == 0)
                .unwrap_or(false);
            if still_running {
                if let Some(record) = engine.lock().resources.get_mut(&id) {
                    record.position_base = record.position();
                    record.started_at = None;
                    record.playing = false;
                }
                engine.emit(id, EngineEvent::Completed);
            }
        });
    }
}

impl PlaybackEngine for ScriptedEngine {
    fn create_resource(&self, id: ResourceId, listener: EngineListener) -> Box<dyn PlaybackResource> {
        debug!(target: LOG_TARGET, %id, "Creating scripted resource.");
        self.lock().resources.insert(
            id,
            ResourceRecord {
                listener,
                locator: None,
                calls: Vec::new(),
                prepared: false,
                playing: false,
                position_base: Duration::ZERO,
                started_at: None,
                volume: Volume::FULL,
                release_count: 0,
                play_epoch: 0,
            },
        );
        Box::new(ScriptedResource { id, engine: self.clone() })
    }
}

struct ScriptedResource {
    id: ResourceId,
    engine: ScriptedEngine,
}

/// Engine settings a resource consults while handling a call.
struct CallContext {
    auto_prepare: bool,
    realtime: bool,
    track_length: Option<Duration>,
    unavailable: bool,
    failure: Option<EngineError>,
    start_failure: Option<EngineError>,
}

impl ScriptedResource {
    /// Records `call` and runs `f` on this resource's record.
    fn with_record<T>(
        &self,
        call: ResourceCall,
        f: impl FnOnce(&mut ResourceRecord, &CallContext) -> Result<T, AudioError>,
    ) -> Result<T, AudioError> {
        let mut inner = self.engine.lock();
        let locator = inner.resources.get(&self.id).and_then(|r| r.locator.clone());
        let context = CallContext {
            auto_prepare: inner.auto_prepare,
            realtime: inner.realtime,
            track_length: inner.track_length,
            unavailable: match &call {
                ResourceCall::SetSource(l) => inner.unavailable.contains(l),
                _ => false,
            },
            failure: locator.as_ref().and_then(|l| inner.prepare_failures.get(l).copied()),
            start_failure: locator.as_ref().and_then(|l| inner.start_failures.get(l).copied()),
        };
        let record = inner
            .resources
            .get_mut(&self.id)
            .ok_or_else(|| AudioError::InvalidState(format!("unknown {}", self.id)))?;
        record.calls.push(call);
        f(record, &context)
    }
}

impl PlaybackResource for ScriptedResource {
    fn set_output_category(&mut self, category: StreamCategory) {
        let _ = self.with_record(ResourceCall::SetOutputCategory(category), |_, _| Ok(()));
    }

    fn set_source(&mut self, locator: &str) -> Result<(), AudioError> {
        self.with_record(ResourceCall::SetSource(locator.to_string()), |record, view| {
            if view.unavailable {
                return Err(AudioError::SourceUnavailable(locator.to_string()));
            }
            record.locator = Some(locator.to_string());
            Ok(())
        })
    }

    fn prepare_async(&mut self) -> Result<(), AudioError> {
        let outcome = self.with_record(ResourceCall::PrepareAsync, |record, view| {
            if record.locator.is_none() {
                return Err(AudioError::InvalidState("no source set".to_string()));
            }
            record.prepared = false;
            Ok(if view.auto_prepare {
                Some(view.failure.map(EngineEvent::Error).unwrap_or(EngineEvent::Prepared))
            } else {
                None
            })
        })?;
        if let Some(event) = outcome {
            self.engine.emit(self.id, event);
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let schedule = self.with_record(ResourceCall::Start, |record, view| {
            if !record.prepared {
                return Err(AudioError::InvalidState("start before prepared".to_string()));
            }
            if let Some(error) = view.start_failure {
                return Err(AudioError::Engine(error));
            }
            if record.playing {
                return Ok(None);
            }
            record.playing = true;
            record.play_epoch += 1;
            if view.realtime {
                record.started_at = Some(Instant::now());
            }
            Ok(match (view.realtime, view.track_length) {
                (true, Some(length)) => Some((record.play_epoch, length.saturating_sub(record.position()))),
                _ => None,
            })
        })?;
        if let Some((epoch, remaining)) = schedule {
            self.engine.schedule_completion(self.id, epoch, remaining);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.with_record(ResourceCall::Pause, |record, _| {
            record.position_base = record.position();
            record.started_at = None;
            record.playing = false;
            Ok(())
        })
    }

    fn seek_to(&mut self, position: Duration) -> Result<(), AudioError> {
        self.with_record(ResourceCall::SeekTo(position), |record, _| {
            record.position_base = position;
            if record.started_at.is_some() {
                record.started_at = Some(Instant::now());
            }
            Ok(())
        })?;
        self.engine.emit(self.id, EngineEvent::SeekComplete);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.with_record(ResourceCall::Stop, |record, _| {
            record.position_base = record.position();
            record.started_at = None;
            record.playing = false;
            record.prepared = false;
            Ok(())
        })
    }

    fn set_volume(&mut self, volume: Volume) -> Result<(), AudioError> {
        self.with_record(ResourceCall::SetVolume(volume), |record, _| {
            record.volume = volume;
            Ok(())
        })
    }

    fn is_playing(&self) -> bool {
        self.engine.is_playing(self.id)
    }

    fn current_position(&self) -> Duration {
        self.engine.position(self.id).unwrap_or_default()
    }

    fn release(&mut self) {
        let _ = self.with_record(ResourceCall::Release, |record, _| {
            record.release_count += 1;
            record.position_base = record.position();
            record.started_at = None;
            record.playing = false;
            Ok(())
        });
    }
}
