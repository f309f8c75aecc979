//! Audio focus: the shared arbiter contract and the adapter that routes its notifications

mod adapter;
mod arbiter;

pub use adapter::{FocusAdapter, FocusState, DEFAULT_DUCK_VOLUME};
pub use arbiter::{
    AudioArbiter, FocusChange, FocusClientId, FocusGain, FocusListener, FocusRequest, FocusRequestResult,
    LocalArbiter,
};
