use super::PlayerError;
use crate::audio::{EngineEvent, ResourceId, Volume};
use crate::focus::{FocusChange, FocusState};
use std::fmt;
use std::time::Duration;
use tokio::sync::oneshot;

pub type Reply<T = ()> = oneshot::Sender<Result<T, PlayerError>>;

/// Commands that can be sent to the Player task.
#[derive(Debug)]
pub enum PlayerCommand {
    PlayMedia { locator: String, reply: Reply },
    PauseMedia(Reply),
    ResumeMedia(Reply),
    StopMedia(Reply),
    GetSnapshot(oneshot::Sender<PlayerSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Everything the Player task reacts to, in arrival order.
#[derive(Debug)]
pub enum PlayerEvent {
    Command(PlayerCommand),
    Engine { resource: ResourceId, event: EngineEvent },
    Focus(FocusChange),
}

/// Lifecycle state of the playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    /// Output halted; the resource is kept but must be prepared again.
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub session: SessionState,
    pub focus: FocusState,
    pub locator: Option<String>,
    pub resource: Option<ResourceId>,
    pub position: Duration,
    pub volume: Option<Volume>,
}

/// Updates broadcast by the Player task about its state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStateUpdate {
    StateChanged { from: SessionState, to: SessionState },
    FocusChanged { change: FocusChange, focus: FocusState },
    VolumeChanged(Volume),
    Progress { resource: ResourceId, position: Duration },
    Error(PlayerError),
    Terminated,
}
