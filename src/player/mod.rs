use crate::audio::{EngineListener, PlaybackEngine, Volume};
use crate::config::Settings;
use crate::focus::{AudioArbiter, FocusAdapter, FocusListener, DEFAULT_DUCK_VOLUME};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace};

mod command_handler;
mod error;
mod run_loop;
mod session;
mod state;

pub use error::PlayerError;
pub use session::{Disposition, PlaybackSession};
pub use state::{PlayerCommand, PlayerEvent, PlayerSnapshot, PlayerStateUpdate, Reply, SessionState};

const PLAYER_LOG_TARGET: &str = "r_focusplay::player";

/// Tunables for one playback unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOptions {
    pub duck_volume: f32,
    pub progress_interval: Duration,
    pub state_update_capacity: usize,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        PlayerOptions {
            duck_volume: DEFAULT_DUCK_VOLUME,
            progress_interval: Duration::from_millis(1000),
            state_update_capacity: 32,
        }
    }
}

impl From<&Settings> for PlayerOptions {
    fn from(settings: &Settings) -> Self {
        PlayerOptions {
            duck_volume: settings.duck_volume,
            progress_interval: Duration::from_millis(settings.progress_interval_ms.max(1)),
            state_update_capacity: settings.state_update_capacity.max(1),
        }
    }
}

/// A playback session and its focus adapter, driven by one serialized event queue.
///
/// Engine callbacks, focus notifications and client commands all arrive on the same channel and
/// are handled one at a time by `run`.
pub struct Player {
    session: PlaybackSession,
    focus: FocusAdapter,
    event_rx: mpsc::UnboundedReceiver<PlayerEvent>,
    state_update_tx: broadcast::Sender<PlayerStateUpdate>,
    progress_interval: Duration,
    // Shutdown callers waiting for cleanup to finish.
    shutdown_replies: Vec<oneshot::Sender<()>>,
}

impl Player {
    /// Creates a new Player and the handle clients use to drive it.
    /// The Player itself should be run in a separate task using `Player::run`.
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        arbiter: Arc<dyn AudioArbiter>,
        options: PlayerOptions,
    ) -> (Self, PlayerHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_update_tx, _) = broadcast::channel(options.state_update_capacity.max(1));

        // Listeners hold weak senders so the queue closes once every handle is gone.
        let engine_tx = event_tx.downgrade();
        let engine_listener: EngineListener = Arc::new(move |resource, event| {
            if let Some(tx) = engine_tx.upgrade() {
                let _ = tx.send(PlayerEvent::Engine { resource, event });
            }
        });
        let focus_tx = event_tx.downgrade();
        let focus_listener: FocusListener = Arc::new(move |change| {
            if let Some(tx) = focus_tx.upgrade() {
                let _ = tx.send(PlayerEvent::Focus(change));
            }
        });

        let player = Player {
            session: PlaybackSession::new(engine, engine_listener),
            focus: FocusAdapter::new(arbiter, focus_listener, options.duck_volume),
            event_rx,
            state_update_tx: state_update_tx.clone(),
            progress_interval: options.progress_interval,
            shutdown_replies: Vec::new(),
        };
        let handle = PlayerHandle { event_tx, state_update_tx };
        (player, handle)
    }

    /// Creates a Player and runs it on the current Tokio runtime.
    pub fn spawn(
        engine: Arc<dyn PlaybackEngine>,
        arbiter: Arc<dyn AudioArbiter>,
        options: PlayerOptions,
    ) -> (PlayerHandle, JoinHandle<()>) {
        let (mut player, handle) = Player::new(engine, arbiter, options);
        let task = tokio::spawn(async move { player.run().await });
        (handle, task)
    }

    /// Runs the player's event loop until it terminates. This should be spawned as a Tokio task.
    #[instrument(skip(self), fields(client = %self.focus.client()))]
    pub async fn run(&mut self) {
        run_loop::run_player_loop(self).await;
    }

    /// Sends a state update via the broadcast channel.
    fn broadcast_update(&self, update: PlayerStateUpdate) {
        trace!(target: PLAYER_LOG_TARGET, "Broadcasting state update: {:?}", update);
        if self.state_update_tx.send(update.clone()).is_err() {
            // No subscribers is normal.
            debug!(target: PLAYER_LOG_TARGET, "No active listeners for state update: {:?}", update);
        }
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            session: self.session.state(),
            focus: self.focus.state(),
            locator: self.session.locator().map(str::to_string),
            resource: self.session.resource_id(),
            position: self.session.position(),
            volume: self.session.volume(),
        }
    }

    fn observe(&self) -> (SessionState, Option<Volume>) {
        (self.session.state(), self.session.volume())
    }

    /// Broadcasts whatever changed since `before` was observed.
    fn publish_changes(&self, before: (SessionState, Option<Volume>)) {
        let (state, volume) = self.observe();
        if state != before.0 {
            self.broadcast_update(PlayerStateUpdate::StateChanged { from: before.0, to: state });
        }
        if let Some(volume) = volume {
            if before.1 != Some(volume) {
                self.broadcast_update(PlayerStateUpdate::VolumeChanged(volume));
            }
        }
    }
}

/// Client side of a running Player. Cheap to clone.
#[derive(Clone, Debug)]
pub struct PlayerHandle {
    event_tx: mpsc::UnboundedSender<PlayerEvent>,
    state_update_tx: broadcast::Sender<PlayerStateUpdate>,
}

impl PlayerHandle {
    /// Requests focus and, once granted, loads and starts `locator`.
    pub async fn play_media(&self, locator: impl Into<String>) -> Result<(), PlayerError> {
        let locator = locator.into();
        self.request(|reply| PlayerCommand::PlayMedia { locator, reply }).await
    }

    pub async fn pause_media(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::PauseMedia).await
    }

    pub async fn resume_media(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::ResumeMedia).await
    }

    pub async fn stop_media(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::StopMedia).await
    }

    pub async fn snapshot(&self) -> Result<PlayerSnapshot, PlayerError> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::GetSnapshot(tx))?;
        rx.await.map_err(|_| PlayerError::Terminated)
    }

    /// Releases the resource, abandons focus and stops the unit. Resolves after cleanup.
    pub async fn shutdown(&self) -> Result<(), PlayerError> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Shutdown(tx))?;
        rx.await.map_err(|_| PlayerError::Terminated)
    }

    /// Subscribes to player state updates.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerStateUpdate> {
        self.state_update_tx.subscribe()
    }

    pub fn is_terminated(&self) -> bool {
        self.event_tx.is_closed()
    }

    fn send(&self, command: PlayerCommand) -> Result<(), PlayerError> {
        self.event_tx
            .send(PlayerEvent::Command(command))
            .map_err(|_| PlayerError::Terminated)
    }

    async fn request(&self, make: impl FnOnce(Reply) -> PlayerCommand) -> Result<(), PlayerError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| PlayerError::Terminated)?
    }
}
