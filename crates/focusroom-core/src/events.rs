use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{GrantedReward, PhaseLabel};
use crate::session::{Phase, SessionId, SessionKind};

/// Every state change in a session produces an Event.
/// The presentation layer subscribes to them; the engine also returns them
/// from each command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: SessionId,
        kind: SessionKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    Paused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A timed phase ran out and the session moved on.
    PhaseCompleted {
        session_id: SessionId,
        completed: PhaseLabel,
        next_phase: Phase,
        cycles_completed: u32,
        at: DateTime<Utc>,
    },
    SessionFinished {
        session_id: SessionId,
        kind: SessionKind,
        cycles_completed: u32,
        at: DateTime<Utc>,
    },
    Rated {
        session_id: SessionId,
        rating: Option<u8>,
        at: DateTime<Utc>,
    },
    Reset {
        at: DateTime<Utc>,
    },
    /// A background call to the session service gave up. Local state is
    /// unaffected.
    SyncFailed {
        session_id: Option<SessionId>,
        operation: String,
        sequence: u64,
        message: String,
        at: DateTime<Utc>,
    },
    RewardsGranted {
        rewards: Vec<GrantedReward>,
        at: DateTime<Utc>,
    },
}
