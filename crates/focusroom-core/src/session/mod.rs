mod config;
mod engine;
mod outbox;
mod runtime;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{
    IntervalConfig, MeditationConfig, SessionConfig, SessionDefaults, SessionKind, SettingsPatch,
};
pub use engine::SessionEngine;
pub use outbox::{OutboundCall, OutboundEvent, SyncOutbox, SyncPolicy};
pub use runtime::{RuntimeOptions, SessionHandle, SessionRuntime};
pub use state::{Phase, SessionId, SessionState, SessionView};
