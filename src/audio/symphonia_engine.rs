// src/audio/symphonia_engine.rs
use crate::audio::{
    decoder::{DecodeOutcome, SymphoniaDecoder},
    engine::{EngineEvent, EngineListener, PlaybackEngine, PlaybackResource, ResourceId, StreamCategory, Volume},
    error::AudioError,
    progress::{lock_progress, new_shared_progress, PlaybackProgressInfo, SharedProgress},
    stream_wrapper::BufferedRemoteSource,
};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};
use url::Url;

const LOG_TARGET: &str = "r_focusplay::audio::symphonia_engine";

/// Engine backed by Symphonia.
///
/// Each resource decodes on its own render thread, paced to wall-clock time, and keeps the
/// shared progress up to date. Decoded samples are not routed to an output device.
pub struct SymphoniaEngine {
    client: Client,
}

impl SymphoniaEngine {
    pub fn new() -> Self {
        let client = match Client::builder().timeout(Duration::from_secs(30)).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(target: LOG_TARGET, "Error creating HTTP client with timeout: {:?}. Falling back to default.", e);
                Client::new()
            }
        };
        SymphoniaEngine { client }
    }
}

impl Default for SymphoniaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine for SymphoniaEngine {
    fn create_resource(&self, id: ResourceId, listener: EngineListener) -> Box<dyn PlaybackResource> {
        debug!(target: LOG_TARGET, %id, "Creating Symphonia playback resource.");
        Box::new(SymphoniaResource::new(id, listener, self.client.clone()))
    }
}

/// Where a resource reads its media from.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaLocation {
    Local(PathBuf),
    Remote(Url),
}

impl MediaLocation {
    /// Resolves a locator: `http(s)://` and `file://` URLs, otherwise a filesystem path that must
    /// name an existing regular file.
    pub fn parse(locator: &str) -> Result<Self, AudioError> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(AudioError::SourceUnavailable("empty locator".to_string()));
        }
        if let Ok(url) = Url::parse(trimmed) {
            match url.scheme() {
                "http" | "https" => return Ok(MediaLocation::Remote(url)),
                "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|_| AudioError::SourceUnavailable(format!("invalid file URL: {}", trimmed)))?;
                    return Self::local(path);
                }
                // Anything else (including Windows drive letters) is treated as a path.
                _ => {}
            }
        }
        Self::local(PathBuf::from(trimmed))
    }

    fn local(path: PathBuf) -> Result<Self, AudioError> {
        let metadata = std::fs::metadata(&path)
            .map_err(|e| AudioError::SourceUnavailable(format!("{}: {}", path.display(), e)))?;
        if !metadata.is_file() {
            return Err(AudioError::SourceUnavailable(format!("{} is not a file", path.display())));
        }
        Ok(MediaLocation::Local(path))
    }

    /// File extension used as a probe hint.
    pub fn extension(&self) -> Option<String> {
        let path = match self {
            MediaLocation::Local(path) => path.clone(),
            MediaLocation::Remote(url) => PathBuf::from(url.path()),
        };
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceState {
    Idle,
    Initialized,
    Preparing,
    Started,
    Paused,
    Stopped,
    Released,
}

#[derive(Debug)]
enum WorkerControl {
    Start,
    Pause,
    Seek(Duration),
    Stop,
}

struct SymphoniaResource {
    id: ResourceId,
    listener: EngineListener,
    client: Client,
    category: StreamCategory,
    location: Option<MediaLocation>,
    state: ResourceState,
    control_tx: Option<Sender<WorkerControl>>,
    prepare_task: Option<JoinHandle<()>>,
    progress: SharedProgress,
    // Bumped on every prepare and every worker shutdown. Events from an older cycle are dropped.
    cycle: Arc<Mutex<u64>>,
}

impl SymphoniaResource {
    fn new(id: ResourceId, listener: EngineListener, client: Client) -> Self {
        SymphoniaResource {
            id,
            listener,
            client,
            category: StreamCategory::Music,
            location: None,
            state: ResourceState::Idle,
            control_tx: None,
            prepare_task: None,
            progress: new_shared_progress(),
            cycle: Arc::new(Mutex::new(0)),
        }
    }

    fn send_control(&self, control: WorkerControl) -> Result<(), AudioError> {
        match &self.control_tx {
            Some(tx) => tx
                .send(control)
                .map_err(|_| AudioError::InvalidState("render worker is gone".to_string())),
            None => Err(AudioError::InvalidState("resource is not prepared".to_string())),
        }
    }

    fn invalid(&self, operation: &str) -> AudioError {
        AudioError::InvalidState(format!("{} not allowed in state {:?}", operation, self.state))
    }

    /// Starts a new prepare cycle and returns a listener that only forwards events of that cycle.
    fn begin_cycle(&self) -> EngineListener {
        let current = {
            let mut cycle = lock_cycle(&self.cycle);
            *cycle += 1;
            *cycle
        };
        let cycle = self.cycle.clone();
        let listener = self.listener.clone();
        Arc::new(move |id, event| {
            // Held across delivery so a shutdown cannot slip in between the check and the send.
            let active = lock_cycle(&cycle);
            if *active == current {
                listener(id, event);
            } else {
                trace!(target: LOG_TARGET, %id, ?event, cycle = current, "Dropping event from a finished cycle.");
            }
        })
    }

    /// Tears down the render worker and any in-flight prepare.
    fn shut_down_worker(&mut self) {
        *lock_cycle(&self.cycle) += 1;
        if let Some(tx) = self.control_tx.take() {
            // The worker may have exited on its own already.
            let _ = tx.send(WorkerControl::Stop);
        }
        if let Some(task) = self.prepare_task.take() {
            task.abort();
        }
        lock_progress(&self.progress).playing = false;
    }
}

impl PlaybackResource for SymphoniaResource {
    fn set_output_category(&mut self, category: StreamCategory) {
        trace!(target: LOG_TARGET, id = %self.id, ?category, "Output category set.");
        self.category = category;
    }

    fn set_source(&mut self, locator: &str) -> Result<(), AudioError> {
        if self.state != ResourceState::Idle {
            return Err(self.invalid("set_source"));
        }
        let location = MediaLocation::parse(locator)?;
        debug!(target: LOG_TARGET, id = %self.id, ?location, "Source bound.");
        self.location = Some(location);
        self.state = ResourceState::Initialized;
        Ok(())
    }

    #[instrument(skip(self), fields(id = %self.id))]
    fn prepare_async(&mut self) -> Result<(), AudioError> {
        if !matches!(self.state, ResourceState::Initialized | ResourceState::Stopped) {
            return Err(self.invalid("prepare_async"));
        }
        let location = self
            .location
            .clone()
            .ok_or_else(|| AudioError::InvalidState("no source set".to_string()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AudioError::InvalidState(format!("no async runtime available: {}", e)))?;

        let (control_tx, control_rx) = mpsc::channel();
        {
            let mut progress = lock_progress(&self.progress);
            let volume = progress.volume;
            *progress = PlaybackProgressInfo { volume, ..Default::default() };
        }

        let id = self.id;
        let listener = self.begin_cycle();
        let client = self.client.clone();
        let progress = self.progress.clone();
        let task = runtime.spawn(async move {
            let decoder = match load_decoder(&client, location, id, &listener).await {
                Ok(decoder) => decoder,
                Err(e) => {
                    error!(target: LOG_TARGET, %id, "Prepare failed: {}", e);
                    listener(id, EngineEvent::Error(e.to_engine_error()));
                    return;
                }
            };
            lock_progress(&progress).total = decoder.total_duration();

            let worker_listener = listener.clone();
            let spawned = thread::Builder::new()
                .name(format!("render-{}", id.0))
                .spawn(move || render_loop(id, decoder, control_rx, progress, worker_listener));
            match spawned {
                Ok(_) => {
                    info!(target: LOG_TARGET, %id, "Resource prepared.");
                    listener(id, EngineEvent::Prepared);
                }
                Err(e) => {
                    error!(target: LOG_TARGET, %id, "Failed to spawn render thread: {}", e);
                    listener(id, EngineEvent::Error(AudioError::from(e).to_engine_error()));
                }
            }
        });

        self.control_tx = Some(control_tx);
        self.prepare_task = Some(task);
        self.state = ResourceState::Preparing;
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        match self.state {
            ResourceState::Started => Ok(()),
            ResourceState::Preparing | ResourceState::Paused => {
                self.send_control(WorkerControl::Start)?;
                self.state = ResourceState::Started;
                Ok(())
            }
            _ => Err(self.invalid("start")),
        }
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        match self.state {
            ResourceState::Paused => Ok(()),
            ResourceState::Started => {
                self.send_control(WorkerControl::Pause)?;
                self.state = ResourceState::Paused;
                Ok(())
            }
            _ => Err(self.invalid("pause")),
        }
    }

    fn seek_to(&mut self, position: Duration) -> Result<(), AudioError> {
        match self.state {
            ResourceState::Preparing | ResourceState::Started | ResourceState::Paused => {
                self.send_control(WorkerControl::Seek(position))
            }
            _ => Err(self.invalid("seek_to")),
        }
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        match self.state {
            ResourceState::Stopped => Ok(()),
            ResourceState::Preparing | ResourceState::Started | ResourceState::Paused => {
                self.shut_down_worker();
                self.state = ResourceState::Stopped;
                Ok(())
            }
            _ => Err(self.invalid("stop")),
        }
    }

    fn set_volume(&mut self, volume: Volume) -> Result<(), AudioError> {
        if self.state == ResourceState::Released {
            return Err(self.invalid("set_volume"));
        }
        lock_progress(&self.progress).volume = volume;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.state == ResourceState::Started
    }

    fn current_position(&self) -> Duration {
        lock_progress(&self.progress).position
    }

    fn release(&mut self) {
        if self.state == ResourceState::Released {
            return;
        }
        self.shut_down_worker();
        self.state = ResourceState::Released;
        debug!(target: LOG_TARGET, id = %self.id, "Resource released.");
    }
}

impl Drop for SymphoniaResource {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock_cycle(cycle: &Mutex<u64>) -> MutexGuard<'_, u64> {
    cycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Opens the media and probes it on a blocking thread.
async fn load_decoder(
    client: &Client,
    location: MediaLocation,
    id: ResourceId,
    listener: &EngineListener,
) -> Result<SymphoniaDecoder, AudioError> {
    let extension = location.extension();
    match location {
        MediaLocation::Local(path) => {
            tokio::task::spawn_blocking(move || {
                let file = std::fs::File::open(&path)?;
                SymphoniaDecoder::new(Box::new(file), extension.as_deref())
            })
            .await?
        }
        MediaLocation::Remote(url) => {
            info!(target: LOG_TARGET, %id, %url, "Fetching remote media.");
            listener(id, EngineEvent::BufferingUpdate(0));
            let response = client.get(url).send().await?.error_for_status()?;
            let expected_len = response.content_length();
            let wrapper = BufferedRemoteSource::download(response.bytes_stream(), expected_len, |percent| {
                listener(id, EngineEvent::BufferingUpdate(percent))
            })
            .await?;
            tokio::task::spawn_blocking(move || SymphoniaDecoder::new(Box::new(wrapper), extension.as_deref())).await?
        }
    }
}

/// Decodes packets while started, sleeping so that stream time tracks wall-clock time.
fn render_loop(
    id: ResourceId,
    mut decoder: SymphoniaDecoder,
    control_rx: Receiver<WorkerControl>,
    progress: SharedProgress,
    listener: EngineListener,
) {
    debug!(target: LOG_TARGET, %id, "Render worker started.");
    let mut playing = false;
    let mut clock = (Instant::now(), Duration::ZERO);

    loop {
        let control = if playing {
            match control_rx.try_recv() {
                Ok(control) => Some(control),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match control_rx.recv() {
                Ok(control) => Some(control),
                Err(_) => break,
            }
        };

        if let Some(control) = control {
            trace!(target: LOG_TARGET, %id, ?control, "Render worker control.");
            match control {
                WorkerControl::Start => {
                    playing = true;
                    let mut info = lock_progress(&progress);
                    info.playing = true;
                    clock = (Instant::now(), info.position);
                }
                WorkerControl::Pause => {
                    playing = false;
                    lock_progress(&progress).playing = false;
                }
                WorkerControl::Seek(target) => match decoder.seek(target) {
                    Ok(reached) => {
                        lock_progress(&progress).position = reached;
                        clock = (Instant::now(), reached);
                        listener(id, EngineEvent::SeekComplete);
                    }
                    Err(e) => {
                        error!(target: LOG_TARGET, %id, "Seek failed: {}", e);
                        listener(id, EngineEvent::Error(e.to_engine_error()));
                        break;
                    }
                },
                WorkerControl::Stop => break,
            }
            continue;
        }

        match decoder.decode_next() {
            Ok(DecodeOutcome::Decoded { position }) => {
                lock_progress(&progress).position = position;
                let due = clock.0 + position.saturating_sub(clock.1);
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
            }
            Ok(DecodeOutcome::EndOfStream) => {
                lock_progress(&progress).playing = false;
                info!(target: LOG_TARGET, %id, "Playback reached end of stream.");
                listener(id, EngineEvent::Completed);
                break;
            }
            Err(e) => {
                lock_progress(&progress).playing = false;
                error!(target: LOG_TARGET, %id, "Decode failed: {}", e);
                listener(id, EngineEvent::Error(e.to_engine_error()));
                break;
            }
        }
    }
    debug!(target: LOG_TARGET, %id, "Render worker finished.");
}
