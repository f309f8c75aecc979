// src/focus/arbiter.rs
use crate::audio::StreamCategory;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, trace};

const LOG_TARGET: &str = "r_focusplay::focus::arbiter";

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity under which a client holds or waits for focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FocusClientId(pub u64);

impl FocusClientId {
    /// Allocates a process-unique client id.
    pub fn next() -> Self {
        FocusClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FocusClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "focus-client#{}", self.0)
    }
}

/// Contention mode of a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusGain {
    /// Indefinite; the previous holder loses focus permanently.
    Gain,
    /// Short; the previous holder should pause.
    GainTransient,
    /// Short; the previous holder may keep playing at reduced volume.
    GainTransientMayDuck,
}

impl FocusGain {
    /// What the previous holder is told when a request with this gain is granted.
    pub fn loss_for_previous_holder(&self) -> FocusChange {
        match self {
            FocusGain::Gain => FocusChange::LostPermanent,
            FocusGain::GainTransient => FocusChange::LostTransient,
            FocusGain::GainTransientMayDuck => FocusChange::LostTransientCanDuck,
        }
    }
}

/// Synchronous answer to a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequestResult {
    Granted,
    Denied,
}

/// Asynchronous focus-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gained,
    LostPermanent,
    LostTransient,
    LostTransientCanDuck,
}

impl fmt::Display for FocusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FocusChange::Gained => "gained",
            FocusChange::LostPermanent => "lost-permanent",
            FocusChange::LostTransient => "lost-transient",
            FocusChange::LostTransientCanDuck => "lost-transient-duckable",
        };
        f.write_str(name)
    }
}

/// Callback through which the arbiter delivers focus changes. Invoked from any thread.
pub type FocusListener = Arc<dyn Fn(FocusChange) + Send + Sync + 'static>;

/// A request for audio focus.
#[derive(Clone)]
pub struct FocusRequest {
    pub client: FocusClientId,
    pub category: StreamCategory,
    pub gain: FocusGain,
    pub listener: FocusListener,
}

impl fmt::Debug for FocusRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusRequest")
            .field("client", &self.client)
            .field("category", &self.category)
            .field("gain", &self.gain)
            .finish_non_exhaustive()
    }
}

/// The shared, system-wide audio focus arbiter.
#[async_trait]
pub trait AudioArbiter: Send + Sync {
    /// Asks for focus. Once granted, `request.listener` receives changes until the client abandons.
    async fn request_focus(&self, request: FocusRequest) -> FocusRequestResult;

    /// Relinquishes focus. Returns whether the arbiter acknowledged.
    async fn abandon_focus(&self, client: FocusClientId) -> bool;
}

struct StackEntry {
    client: FocusClientId,
    gain: FocusGain,
    listener: FocusListener,
}

#[derive(Default)]
struct ArbiterState {
    // Top of the stack (current holder) is the last entry.
    stack: Vec<StackEntry>,
    locked: bool,
}

/// In-process arbiter keeping a stack of focus holders.
///
/// A granted request notifies the previous top of the stack with the loss matching the new
/// request's gain. When the top abandons, the entry beneath it is told `Gained`.
#[derive(Default)]
pub struct LocalArbiter {
    state: Mutex<ArbiterState>,
}

impl LocalArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// While locked, every request is denied (an exclusive owner such as a call).
    pub fn set_locked(&self, locked: bool) {
        info!(target: LOG_TARGET, locked, "Arbiter lock changed.");
        self.lock().locked = locked;
    }

    /// All registered clients, bottom to top.
    pub fn holders(&self) -> Vec<FocusClientId> {
        self.lock().stack.iter().map(|e| e.client).collect()
    }

    fn lock(&self) -> MutexGuard<'_, ArbiterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AudioArbiter for LocalArbiter {
    async fn request_focus(&self, request: FocusRequest) -> FocusRequestResult {
        let displaced = {
            let mut state = self.lock();
            if state.locked {
                info!(target: LOG_TARGET, client = %request.client, "Focus request denied (arbiter locked).");
                return FocusRequestResult::Denied;
            }
            let already_on_top = state.stack.last().map(|e| e.client) == Some(request.client);
            state.stack.retain(|e| e.client != request.client);
            let displaced = if already_on_top {
                None
            } else {
                state
                    .stack
                    .last()
                    .map(|e| (e.client, e.listener.clone(), request.gain.loss_for_previous_holder()))
            };
            state.stack.push(StackEntry {
                client: request.client,
                gain: request.gain,
                listener: request.listener.clone(),
            });
            displaced
        };

        info!(target: LOG_TARGET, client = %request.client, gain = ?request.gain, category = ?request.category, "Focus granted.");
        if let Some((client, listener, change)) = displaced {
            debug!(target: LOG_TARGET, %client, %change, "Notifying previous holder.");
            listener(change);
        }
        FocusRequestResult::Granted
    }

    async fn abandon_focus(&self, client: FocusClientId) -> bool {
        let promoted = {
            let mut state = self.lock();
            let was_top = state.stack.last().map(|e| e.client) == Some(client);
            let before = state.stack.len();
            state.stack.retain(|e| e.client != client);
            if state.stack.len() == before {
                trace!(target: LOG_TARGET, %client, "Abandon from unregistered client.");
                return true;
            }
            if was_top {
                state.stack.last().map(|e| (e.client, e.gain, e.listener.clone()))
            } else {
                None
            }
        };

        info!(target: LOG_TARGET, %client, "Focus abandoned.");
        if let Some((next, gain, listener)) = promoted {
            debug!(target: LOG_TARGET, client = %next, ?gain, "Returning focus to next holder.");
            listener(FocusChange::Gained);
        }
        true
    }
}
