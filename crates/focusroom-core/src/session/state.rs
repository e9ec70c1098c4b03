use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::SessionConfig;
use crate::timer::format_remaining;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    /// Work phase (interval) or the single meditation phase.
    Active,
    /// Break phase of an interval session.
    Resting,
    /// Meditation finished, waiting for the user to rate or dismiss.
    AwaitingRating,
    Finished,
}

impl Phase {
    /// Phases in which the countdown runs.
    pub fn is_timed(self) -> bool {
        matches!(self, Phase::Active | Phase::Resting)
    }
}

/// Opaque identifier issued by the remote lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The live session. `session_id` and `config` are `Some` in every phase
/// except `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Option<SessionId>,
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub cycles_completed: u32,
    pub config: Option<SessionConfig>,
}

impl SessionState {
    pub fn idle() -> Self {
        Self {
            session_id: None,
            phase: Phase::Idle,
            remaining_seconds: 0,
            cycles_completed: 0,
            config: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Read-only projection of `SessionState` for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub phase: Phase,
    pub remaining_seconds: u64,
    /// `MM:SS`
    pub remaining: String,
    pub cycles_completed: u32,
    pub target_cycles: Option<u32>,
    pub is_running: bool,
}

impl SessionView {
    pub fn project(state: &SessionState, is_running: bool) -> Self {
        let target_cycles = match state.config {
            Some(SessionConfig::Interval(ref cfg)) => Some(cfg.target_cycles),
            _ => None,
        };
        Self {
            phase: state.phase,
            remaining_seconds: state.remaining_seconds,
            remaining: format_remaining(state.remaining_seconds),
            cycles_completed: state.cycles_completed,
            target_cycles,
            is_running,
        }
    }
}

impl Default for SessionView {
    fn default() -> Self {
        Self::project(&SessionState::idle(), false)
    }
}
