//! # Focusroom Core Library
//!
//! Timed session engine for focus intervals and guided meditation. The
//! engine counts down locally, reports phase transitions to a remote session
//! service, and asks a reward service for automatic grants when a session
//! completes. The `focusroom` CLI is a thin presentation layer over this
//! crate.
//!
//! ## Architecture
//!
//! - **Timer**: a cooperative countdown advanced by the caller once per second
//! - **Session**: the state machine, the outbound sync queue, and a runtime
//!   task that owns the engine and drives its ticks
//! - **Client**: HTTP wrappers for the lifecycle and reward endpoints
//! - **Notify**: best-effort notifications behind a platform trait
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: session state machine
//! - [`SessionRuntime`] / [`SessionHandle`]: owning task and its command handle
//! - [`Config`]: application configuration management

pub mod client;
pub mod error;
pub mod events;
pub mod notify;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod timer;

pub use client::{
    ApiClient, GrantedReward, HttpLifecycleClient, HttpRewardEvaluator, MeditationVariant,
    PhaseLabel, RewardEvaluator, SessionLifecycleClient,
};
pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use notify::{NotificationBackend, NotificationDispatcher, Permission};
pub use session::{
    IntervalConfig, MeditationConfig, Phase, RuntimeOptions, SessionConfig, SessionDefaults,
    SessionEngine, SessionHandle, SessionId, SessionKind, SessionRuntime, SessionState,
    SessionView, SettingsPatch, SyncPolicy,
};
pub use storage::Config;
pub use timer::format_remaining;
