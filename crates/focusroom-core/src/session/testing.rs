//! Test doubles for the remote services.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::config::{SessionConfig, SessionKind};
use super::state::SessionId;
use crate::client::{GrantedReward, PhaseLabel, RewardEvaluator, SessionLifecycleClient};
use crate::error::{CoreError, Result, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Start(SessionConfig),
    CompletePhase {
        session_id: SessionId,
        phase: PhaseLabel,
        key: Uuid,
    },
    Finish {
        session_id: SessionId,
        kind: SessionKind,
        completed: bool,
        rating: Option<u8>,
        key: Uuid,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartFailure {
    Unavailable,
    Rejected,
}

#[derive(Default)]
pub struct MockLifecycle {
    calls: Mutex<Vec<RecordedCall>>,
    complete_failures: AtomicU32,
    start_failure: Mutex<Option<StartFailure>>,
    started: AtomicU64,
}

impl MockLifecycle {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn starts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::Start(_)))
            .count()
    }

    pub fn completed_phases(&self) -> Vec<PhaseLabel> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::CompletePhase { phase, .. } => Some(phase),
                _ => None,
            })
            .collect()
    }

    pub fn finishes(&self) -> Vec<(SessionKind, bool, Option<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Finish {
                    kind,
                    completed,
                    rating,
                    ..
                } => Some((kind, completed, rating)),
                _ => None,
            })
            .collect()
    }

    /// Fail the next `n` complete-phase calls with `ServiceUnavailable`.
    pub fn fail_next_completes(&self, n: u32) {
        self.complete_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_start(&self, failure: Option<StartFailure>) {
        *self.start_failure.lock().unwrap() = failure;
    }
}

#[async_trait]
impl SessionLifecycleClient for MockLifecycle {
    async fn start(&self, config: &SessionConfig) -> Result<SessionId> {
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall::Start(config.clone()));
        let failure = *self.start_failure.lock().unwrap();
        match failure {
            Some(StartFailure::Unavailable) => {
                Err(CoreError::ServiceUnavailable("connection refused".into()))
            }
            Some(StartFailure::Rejected) => Err(CoreError::Validation(ValidationError::Rejected(
                "HTTP 400: bad config".into(),
            ))),
            None => {
                let n = self.started.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(SessionId::new(format!("session-{n}")))
            }
        }
    }

    async fn complete_phase(
        &self,
        session_id: &SessionId,
        phase: PhaseLabel,
        idempotency_key: Uuid,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedCall::CompletePhase {
            session_id: session_id.clone(),
            phase,
            key: idempotency_key,
        });
        let remaining = self.complete_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.complete_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CoreError::ServiceUnavailable("HTTP 503: busy".into()));
        }
        Ok(())
    }

    async fn finish(
        &self,
        session_id: &SessionId,
        kind: SessionKind,
        completed: bool,
        rating: Option<u8>,
        idempotency_key: Uuid,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedCall::Finish {
            session_id: session_id.clone(),
            kind,
            completed,
            rating,
            key: idempotency_key,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct MockRewards {
    calls: AtomicUsize,
    grant: Option<String>,
}

impl MockRewards {
    pub fn granting(name: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            grant: Some(name.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RewardEvaluator for MockRewards {
    async fn check_automatic(&self) -> Result<Vec<GrantedReward>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .grant
            .iter()
            .map(|name| GrantedReward {
                id: None,
                name: name.clone(),
                description: None,
            })
            .collect())
    }
}
