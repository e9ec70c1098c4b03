//! Outbound sync of phase transitions to the session service.
//!
//! Each transition produces at most one `OutboundEvent`. Delivery runs on a
//! background task: the tick loop never waits for it and a failed delivery
//! never rolls back local state. Events carry a per-session sequence number
//! and an idempotency key so the server can drop duplicates from retries.
//! Deliveries are not ordered relative to each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use super::config::SessionKind;
use super::state::SessionId;
use crate::client::{PhaseLabel, RewardEvaluator, SessionLifecycleClient};
use crate::error::Result;
use crate::events::Event;
use crate::tasks::BackgroundTasks;

/// Retry settings for background delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Extra attempts after the first one. Zero disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    1000
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl SyncPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.min(16)).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum OutboundCall {
    CompletePhase {
        phase: PhaseLabel,
    },
    Finish {
        kind: SessionKind,
        completed: bool,
        rating: Option<u8>,
    },
}

impl OutboundCall {
    pub fn operation(&self) -> &'static str {
        match self {
            OutboundCall::CompletePhase { .. } => "complete_phase",
            OutboundCall::Finish { .. } => "finish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub session_id: SessionId,
    pub sequence: u64,
    pub idempotency_key: Uuid,
    pub call: OutboundCall,
}

impl OutboundEvent {
    pub fn new(session_id: SessionId, sequence: u64, call: OutboundCall) -> Self {
        Self {
            session_id,
            sequence,
            idempotency_key: Uuid::new_v4(),
            call,
        }
    }
}

#[derive(Clone)]
pub struct SyncOutbox {
    lifecycle: Arc<dyn SessionLifecycleClient>,
    rewards: Arc<dyn RewardEvaluator>,
    policy: SyncPolicy,
    events: broadcast::Sender<Event>,
    tasks: BackgroundTasks,
}

impl SyncOutbox {
    pub fn new(
        lifecycle: Arc<dyn SessionLifecycleClient>,
        rewards: Arc<dyn RewardEvaluator>,
        policy: SyncPolicy,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            lifecycle,
            rewards,
            policy,
            events,
            tasks: BackgroundTasks::new(),
        }
    }

    /// Deliver `event` in the background with bounded retry.
    pub fn dispatch(&self, event: OutboundEvent) {
        let lifecycle = self.lifecycle.clone();
        let policy = self.policy;
        let events = self.events.clone();
        self.tasks.spawn(async move {
            if let Err(e) = deliver(lifecycle.as_ref(), &event, policy).await {
                warn!(
                    session_id = %event.session_id,
                    sequence = event.sequence,
                    operation = event.call.operation(),
                    error = %e,
                    "session sync failed"
                );
                let _ = events.send(Event::SyncFailed {
                    session_id: Some(event.session_id.clone()),
                    operation: event.call.operation().to_string(),
                    sequence: event.sequence,
                    message: e.to_string(),
                    at: Utc::now(),
                });
            }
        });
    }

    /// Ask the reward service for automatic grants in the background.
    pub fn check_rewards(&self) {
        let rewards = self.rewards.clone();
        let events = self.events.clone();
        self.tasks.spawn(async move {
            match rewards.check_automatic().await {
                Ok(granted) if granted.is_empty() => debug!("no rewards granted"),
                Ok(granted) => {
                    let _ = events.send(Event::RewardsGranted {
                        rewards: granted,
                        at: Utc::now(),
                    });
                }
                Err(e) => warn!(error = %e, "reward check failed"),
            }
        });
    }

    /// Wait for every in-flight delivery, retries included.
    pub async fn flush(&self) {
        self.tasks.flush().await;
    }
}

async fn deliver(
    lifecycle: &dyn SessionLifecycleClient,
    event: &OutboundEvent,
    policy: SyncPolicy,
) -> Result<()> {
    let mut retry = 0;
    loop {
        let result = match event.call {
            OutboundCall::CompletePhase { phase } => {
                lifecycle
                    .complete_phase(&event.session_id, phase, event.idempotency_key)
                    .await
            }
            OutboundCall::Finish {
                kind,
                completed,
                rating,
            } => {
                lifecycle
                    .finish(
                        &event.session_id,
                        kind,
                        completed,
                        rating,
                        event.idempotency_key,
                    )
                    .await
            }
        };
        match result {
            Ok(()) => {
                debug!(sequence = event.sequence, operation = event.call.operation(), "synced");
                return Ok(());
            }
            Err(e) if e.is_retryable() && retry < policy.max_retries => {
                let delay = policy.backoff(retry);
                debug!(
                    sequence = event.sequence,
                    attempt = retry + 1,
                    ?delay,
                    error = %e,
                    "sync attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
