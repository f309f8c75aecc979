// src/focus/adapter.rs
use super::arbiter::{AudioArbiter, FocusChange, FocusClientId, FocusGain, FocusListener, FocusRequest, FocusRequestResult};
use crate::audio::{StreamCategory, Volume};
use crate::player::{PlaybackSession, PlayerError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

const LOG_TARGET: &str = "r_focusplay::focus::adapter";

/// Attenuation applied while another client holds duckable focus.
pub const DEFAULT_DUCK_VOLUME: f32 = 0.1;

/// This unit's view of its audio focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    None,
    Requested,
    Granted,
    Denied,
}

impl fmt::Display for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FocusState::None => "none",
            FocusState::Requested => "requested",
            FocusState::Granted => "granted",
            FocusState::Denied => "denied",
        };
        f.write_str(name)
    }
}

/// Talks to the shared arbiter on behalf of one playback unit and turns focus notifications into
/// session commands.
pub struct FocusAdapter {
    arbiter: Arc<dyn AudioArbiter>,
    client: FocusClientId,
    listener: FocusListener,
    state: FocusState,
    // Set while the arbiter may still deliver notifications to us.
    registered: bool,
    duck_volume: f32,
}

impl FocusAdapter {
    /// `listener` is handed to the arbiter on every request and must forward changes into the
    /// unit's event queue.
    pub fn new(arbiter: Arc<dyn AudioArbiter>, listener: FocusListener, duck_volume: f32) -> Self {
        FocusAdapter {
            arbiter,
            client: FocusClientId::next(),
            listener,
            state: FocusState::None,
            registered: false,
            duck_volume: duck_volume.clamp(0.0, 1.0),
        }
    }

    pub fn client(&self) -> FocusClientId {
        self.client
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn duck_volume(&self) -> f32 {
        self.duck_volume
    }

    /// Asks for indefinite focus on the music stream.
    #[instrument(skip(self), fields(client = %self.client))]
    pub async fn request_focus(&mut self) -> FocusState {
        self.state = FocusState::Requested;
        let request = FocusRequest {
            client: self.client,
            category: StreamCategory::Music,
            gain: FocusGain::Gain,
            listener: self.listener.clone(),
        };
        self.state = match self.arbiter.request_focus(request).await {
            FocusRequestResult::Granted => {
                self.registered = true;
                FocusState::Granted
            }
            FocusRequestResult::Denied => {
                if self.registered {
                    // An earlier grant is still on the arbiter's books.
                    self.arbiter.abandon_focus(self.client).await;
                    self.registered = false;
                }
                FocusState::Denied
            }
        };
        info!(target: LOG_TARGET, client = %self.client, state = %self.state, "Focus request answered.");
        self.state
    }

    /// Gives focus back. Calling it again, or without ever holding focus, does nothing.
    #[instrument(skip(self), fields(client = %self.client))]
    pub async fn abandon_focus(&mut self) {
        if !self.registered {
            trace!(target: LOG_TARGET, client = %self.client, "Abandon skipped, not registered.");
            self.state = FocusState::None;
            return;
        }
        self.registered = false;
        self.state = FocusState::None;
        if self.arbiter.abandon_focus(self.client).await {
            info!(target: LOG_TARGET, client = %self.client, "Focus abandoned.");
        } else {
            warn!(target: LOG_TARGET, client = %self.client, "Arbiter did not acknowledge abandon.");
        }
    }

    /// Applies one focus notification to `session`.
    pub fn on_focus_changed(&mut self, change: FocusChange, session: &mut PlaybackSession) -> Result<(), PlayerError> {
        if !self.registered {
            debug!(target: LOG_TARGET, client = %self.client, %change, "Discarding focus change after abandon.");
            return Ok(());
        }
        info!(target: LOG_TARGET, client = %self.client, %change, session = ?session.state(), "Focus changed.");

        match change {
            FocusChange::Gained => {
                self.state = FocusState::Granted;
                let outcome = if session.has_resource() {
                    session.resume()
                } else {
                    // The resource went away with a permanent loss; build a fresh one.
                    session.reload()
                };
                session.set_volume(Volume::FULL);
                outcome
            }
            FocusChange::LostPermanent => {
                session.stop();
                session.release();
                self.state = FocusState::None;
                Ok(())
            }
            FocusChange::LostTransient => {
                session.pause();
                Ok(())
            }
            FocusChange::LostTransientCanDuck => {
                if session.is_outputting() {
                    session.set_volume(Volume::uniform(self.duck_volume));
                } else {
                    trace!(target: LOG_TARGET, "Not outputting, nothing to duck.");
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for FocusAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusAdapter")
            .field("client", &self.client)
            .field("state", &self.state)
            .field("registered", &self.registered)
            .field("duck_volume", &self.duck_volume)
            .finish_non_exhaustive()
    }
}
