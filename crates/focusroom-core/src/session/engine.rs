//! Session engine.
//!
//! Owns the single live `SessionState` and the `Clock` driving it. The
//! engine has no thread of its own: the runtime (or a test) calls `tick()`
//! once per second while the clock is armed.
//!
//! ## Phases
//!
//! ```text
//! Interval:   Idle -> Active <-> Resting            (reset -> Idle)
//!                       \-> Finished                (only with auto_stop_at_target)
//! Meditation: Idle -> Active -> AwaitingRating -> Finished
//! ```
//!
//! Remote calls made on a transition go through the `SyncOutbox` and never
//! block or roll back the local countdown. Only `start` waits on the server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use super::config::{SessionConfig, SessionDefaults, SessionKind, SettingsPatch};
use super::outbox::{OutboundCall, OutboundEvent, SyncOutbox, SyncPolicy};
use super::state::{Phase, SessionId, SessionState, SessionView};
use crate::client::{PhaseLabel, RewardEvaluator, SessionLifecycleClient};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::notify::NotificationDispatcher;
use crate::timer::{Clock, ClockSignal};

const EVENT_CAPACITY: usize = 64;

pub struct SessionEngine {
    lifecycle: Arc<dyn SessionLifecycleClient>,
    outbox: SyncOutbox,
    notifier: NotificationDispatcher,
    defaults: SessionDefaults,
    state: SessionState,
    clock: Clock,
    next_sequence: u64,
    last_activity: Option<Instant>,
    events: broadcast::Sender<Event>,
}

impl SessionEngine {
    pub fn new(
        lifecycle: Arc<dyn SessionLifecycleClient>,
        rewards: Arc<dyn RewardEvaluator>,
        notifier: NotificationDispatcher,
        defaults: SessionDefaults,
        policy: SyncPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let outbox = SyncOutbox::new(lifecycle.clone(), rewards, policy, events.clone());
        Self {
            lifecycle,
            outbox,
            notifier,
            defaults,
            state: SessionState::idle(),
            clock: Clock::new(),
            next_sequence: 0,
            last_activity: None,
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Whether the countdown is currently armed (not paused).
    pub fn is_running(&self) -> bool {
        self.clock.is_armed()
    }

    pub fn view(&self) -> SessionView {
        SessionView::project(&self.state, self.is_running())
    }

    pub fn defaults(&self) -> &SessionDefaults {
        &self.defaults
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    /// True while the countdown runs or if anything happened within `window`.
    pub fn recently_active(&self, window: Duration) -> bool {
        self.is_running()
            || self
                .last_activity
                .is_some_and(|at| at.elapsed() <= window)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session with an explicit configuration.
    ///
    /// Requires `Idle`. The configuration is validated before any remote
    /// call; if the remote start fails the engine stays `Idle`.
    pub async fn start(&mut self, config: SessionConfig) -> Result<Event> {
        self.require(Phase::Idle, "start")?;
        config.validate()?;

        let session_id = self.lifecycle.start(&config).await?;
        // `&mut self` is held across the await, so the phase cannot have moved.
        let duration = config.initial_seconds();
        let kind = config.kind();
        info!(%session_id, ?kind, duration, "session started");

        self.state = SessionState {
            session_id: Some(session_id.clone()),
            phase: Phase::Active,
            remaining_seconds: duration,
            cycles_completed: 0,
            config: Some(config),
        };
        self.next_sequence = 0;
        self.clock.disarm();
        self.clock.arm(duration);
        self.touch();

        self.notifier.notify(title_for(kind), start_message(kind));
        Ok(self.emit(Event::SessionStarted {
            session_id,
            kind,
            duration_secs: duration,
            at: Utc::now(),
        }))
    }

    /// Start a session from the configured defaults for `kind`.
    pub async fn start_default(&mut self, kind: SessionKind) -> Result<Event> {
        let config = self.defaults.config_for(kind);
        self.start(config).await
    }

    /// Stop the countdown without leaving the phase. Local only.
    ///
    /// Returns `Ok(None)` if already paused.
    pub fn pause(&mut self) -> Result<Option<Event>> {
        self.require_timed("pause")?;
        if !self.clock.is_armed() {
            return Ok(None);
        }
        self.clock.disarm();
        self.touch();
        debug!(remaining = self.state.remaining_seconds, "paused");
        Ok(Some(self.emit(Event::Paused {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_seconds,
            at: Utc::now(),
        })))
    }

    /// Re-arm the countdown from where it was paused. Local only.
    ///
    /// Returns `Ok(None)` if already running.
    pub fn resume(&mut self) -> Result<Option<Event>> {
        self.require_timed("resume")?;
        if self.clock.is_armed() {
            return Ok(None);
        }
        self.clock.arm(self.state.remaining_seconds);
        self.touch();
        debug!(remaining = self.state.remaining_seconds, "resumed");
        Ok(Some(self.emit(Event::Resumed {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_seconds,
            at: Utc::now(),
        })))
    }

    /// Drop the session and return to `Idle`. Valid from any phase.
    ///
    /// Nothing is sent to the server.
    pub fn reset(&mut self) -> Event {
        self.clock.disarm();
        if let Some(ref id) = self.state.session_id {
            debug!(session_id = %id, phase = ?self.state.phase, "session reset");
        }
        self.state = SessionState::idle();
        self.emit(Event::Reset { at: Utc::now() })
    }

    /// Merge `patch` into the defaults used by the next `start`.
    pub fn configure(&mut self, patch: &SettingsPatch) -> Result<()> {
        self.require(Phase::Idle, "configure")?;
        self.defaults = self.defaults.apply(patch)?;
        Ok(())
    }

    /// Rate a finished meditation (`Some(1..=5)`) or dismiss the prompt
    /// (`None`). Moves `AwaitingRating -> Finished`.
    pub fn rate(&mut self, rating: Option<u8>) -> Result<Event> {
        self.require(Phase::AwaitingRating, "rate")?;
        if let Some(r) = rating {
            if !(1..=5).contains(&r) {
                return Err(ValidationError::RatingOutOfRange { rating: r }.into());
            }
        }
        let session_id = self.session_id("rate")?;
        if rating.is_some() {
            self.dispatch(
                &session_id,
                OutboundCall::Finish {
                    kind: SessionKind::Meditation,
                    completed: true,
                    rating,
                },
            );
        }
        self.state.phase = Phase::Finished;
        self.touch();
        Ok(self.emit(Event::Rated {
            session_id,
            rating,
            at: Utc::now(),
        }))
    }

    /// Advance the countdown by one second.
    ///
    /// Returns an event when the tick completed a phase. The transition and
    /// the re-arm for the next phase happen within this call.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.phase.is_timed() {
            return None;
        }
        let signal = self.clock.advance()?;
        self.touch();
        match signal {
            ClockSignal::Tick { remaining } => {
                self.state.remaining_seconds = remaining;
                None
            }
            ClockSignal::Expired => {
                self.state.remaining_seconds = 0;
                self.complete_phase()
            }
        }
    }

    /// Fire-and-forget reward evaluation.
    pub fn check_rewards(&self) {
        self.outbox.check_rewards();
    }

    /// Disarm the clock for teardown and wait for in-flight background work.
    pub async fn shutdown(&mut self) {
        self.clock.disarm();
        self.outbox.flush().await;
        self.notifier.flush().await;
    }

    /// Wait for in-flight background work without touching the session.
    pub async fn flush(&self) {
        self.outbox.flush().await;
        self.notifier.flush().await;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_phase(&mut self) -> Option<Event> {
        let session_id = self.state.session_id.clone()?;
        let config = self.state.config.clone()?;
        let phase = self.state.phase;
        match (config, phase) {
            (SessionConfig::Interval(cfg), Phase::Active) => {
                self.state.cycles_completed += 1;
                self.dispatch(
                    &session_id,
                    OutboundCall::CompletePhase {
                        phase: PhaseLabel::Work,
                    },
                );
                if cfg.auto_stop_at_target && self.state.cycles_completed >= cfg.target_cycles {
                    return Some(self.finish(session_id, SessionKind::Interval, Phase::Finished));
                }
                self.enter(Phase::Resting, cfg.break_seconds);
                self.notifier.notify(
                    title_for(SessionKind::Interval),
                    "Work phase complete. Time for a break.",
                );
                Some(self.phase_completed(session_id, PhaseLabel::Work))
            }
            (SessionConfig::Interval(cfg), Phase::Resting) => {
                self.dispatch(
                    &session_id,
                    OutboundCall::CompletePhase {
                        phase: PhaseLabel::Rest,
                    },
                );
                self.enter(Phase::Active, cfg.work_seconds);
                self.notifier.notify(
                    title_for(SessionKind::Interval),
                    "Break is over. Back to work.",
                );
                Some(self.phase_completed(session_id, PhaseLabel::Rest))
            }
            (SessionConfig::Meditation(_), Phase::Active) => {
                Some(self.finish(session_id, SessionKind::Meditation, Phase::AwaitingRating))
            }
            _ => None,
        }
    }

    /// Terminal completion: tell the server, notify, evaluate rewards.
    fn finish(&mut self, session_id: SessionId, kind: SessionKind, next: Phase) -> Event {
        self.dispatch(
            &session_id,
            OutboundCall::Finish {
                kind,
                completed: true,
                rating: None,
            },
        );
        self.clock.disarm();
        self.state.phase = next;
        self.state.remaining_seconds = 0;
        info!(%session_id, ?kind, cycles = self.state.cycles_completed, "session finished");
        self.notifier.notify(title_for(kind), finish_message(kind));
        self.outbox.check_rewards();
        self.emit(Event::SessionFinished {
            session_id,
            kind,
            cycles_completed: self.state.cycles_completed,
            at: Utc::now(),
        })
    }

    fn enter(&mut self, phase: Phase, duration: u64) {
        debug!(from = ?self.state.phase, to = ?phase, duration, "phase transition");
        self.state.phase = phase;
        self.state.remaining_seconds = duration;
        self.clock.disarm();
        self.clock.arm(duration);
    }

    fn phase_completed(&self, session_id: SessionId, completed: PhaseLabel) -> Event {
        self.emit(Event::PhaseCompleted {
            session_id,
            completed,
            next_phase: self.state.phase,
            cycles_completed: self.state.cycles_completed,
            at: Utc::now(),
        })
    }

    fn dispatch(&mut self, session_id: &SessionId, call: OutboundCall) {
        self.next_sequence += 1;
        self.outbox
            .dispatch(OutboundEvent::new(session_id.clone(), self.next_sequence, call));
    }

    fn emit(&self, event: Event) -> Event {
        // No subscribers is fine.
        let _ = self.events.send(event.clone());
        event
    }

    fn touch(&mut self) {
        self.last_activity = Some(Instant::now());
    }

    fn session_id(&self, operation: &'static str) -> Result<SessionId> {
        self.state
            .session_id
            .clone()
            .ok_or(CoreError::InvalidState {
                operation,
                phase: self.state.phase,
            })
    }

    fn require(&self, phase: Phase, operation: &'static str) -> Result<()> {
        if self.state.phase != phase {
            return Err(CoreError::InvalidState {
                operation,
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn require_timed(&self, operation: &'static str) -> Result<()> {
        if !self.state.phase.is_timed() {
            return Err(CoreError::InvalidState {
                operation,
                phase: self.state.phase,
            });
        }
        Ok(())
    }
}

fn title_for(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Interval => "Focus",
        SessionKind::Meditation => "Meditation",
    }
}

fn start_message(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Interval => "Focus session started.",
        SessionKind::Meditation => "Meditation started.",
    }
}

fn finish_message(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Interval => "Target cycles reached. Session complete.",
        SessionKind::Meditation => "You completed your meditation. Well done!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingBackend;
    use crate::notify::Permission;
    use crate::session::config::{IntervalConfig, MeditationConfig};
    use crate::session::testing::{MockLifecycle, MockRewards, StartFailure};

    struct Harness {
        engine: SessionEngine,
        lifecycle: Arc<MockLifecycle>,
        rewards: Arc<MockRewards>,
        notes: Arc<RecordingBackend>,
    }

    fn harness() -> Harness {
        let lifecycle = Arc::new(MockLifecycle::default());
        let rewards = Arc::new(MockRewards::default());
        let notes = Arc::new(RecordingBackend::new(Permission::Granted));
        let engine = SessionEngine::new(
            lifecycle.clone(),
            rewards.clone(),
            NotificationDispatcher::new(notes.clone()),
            SessionDefaults::default(),
            SyncPolicy {
                max_retries: 0,
                backoff_ms: 10,
            },
        );
        Harness {
            engine,
            lifecycle,
            rewards,
            notes,
        }
    }

    fn pomodoro() -> SessionConfig {
        SessionConfig::Interval(IntervalConfig {
            work_seconds: 25 * 60,
            break_seconds: 5 * 60,
            target_cycles: 4,
            auto_stop_at_target: false,
        })
    }

    fn meditation(seconds: u64) -> SessionConfig {
        SessionConfig::Meditation(MeditationConfig {
            duration_seconds: seconds,
            variant: "mindfulness".into(),
        })
    }

    fn advance(engine: &mut SessionEngine, seconds: u64) -> Vec<Event> {
        (0..seconds).filter_map(|_| engine.tick()).collect()
    }

    #[tokio::test]
    async fn start_sets_active_with_full_duration() {
        let mut h = harness();
        let event = h.engine.start(pomodoro()).await.unwrap();
        assert!(matches!(event, Event::SessionStarted { duration_secs: 1500, .. }));

        let state = h.engine.state();
        assert_eq!(state.phase, Phase::Active);
        assert_eq!(state.remaining_seconds, 1500);
        assert_eq!(state.session_id, Some(SessionId::new("session-1")));
        assert!(h.engine.is_running());
    }

    #[tokio::test]
    async fn interval_work_expiry_moves_to_resting_then_back() {
        let mut h = harness();
        h.engine.start(pomodoro()).await.unwrap();

        let events = advance(&mut h.engine, 1500);
        assert_eq!(events.len(), 1);
        let state = h.engine.state();
        assert_eq!(state.phase, Phase::Resting);
        assert_eq!(state.remaining_seconds, 300);
        assert_eq!(state.cycles_completed, 1);

        let events = advance(&mut h.engine, 300);
        assert_eq!(events.len(), 1);
        let state = h.engine.state();
        assert_eq!(state.phase, Phase::Active);
        assert_eq!(state.remaining_seconds, 1500);
        assert_eq!(state.cycles_completed, 1);

        h.engine.flush().await;
        assert_eq!(
            h.lifecycle.completed_phases(),
            vec![PhaseLabel::Work, PhaseLabel::Rest]
        );
        assert_eq!(h.notes.shown().len(), 3);
    }

    #[tokio::test]
    async fn interval_keeps_cycling_past_target_by_default() {
        let mut h = harness();
        h.engine
            .start(SessionConfig::Interval(IntervalConfig {
                work_seconds: 2,
                break_seconds: 1,
                target_cycles: 1,
                auto_stop_at_target: false,
            }))
            .await
            .unwrap();

        advance(&mut h.engine, 3 * 3);
        assert_eq!(h.engine.state().cycles_completed, 3);
        assert_eq!(h.engine.phase(), Phase::Active);
        h.engine.flush().await;
        assert!(h.lifecycle.finishes().is_empty());
    }

    #[tokio::test]
    async fn interval_auto_stop_finishes_at_target() {
        let mut h = harness();
        h.engine
            .start(SessionConfig::Interval(IntervalConfig {
                work_seconds: 2,
                break_seconds: 1,
                target_cycles: 2,
                auto_stop_at_target: true,
            }))
            .await
            .unwrap();

        let events = advance(&mut h.engine, 10);
        assert!(matches!(
            events.last(),
            Some(Event::SessionFinished { cycles_completed: 2, .. })
        ));
        assert_eq!(h.engine.phase(), Phase::Finished);
        assert!(!h.engine.is_running());

        h.engine.flush().await;
        assert_eq!(
            h.lifecycle.finishes(),
            vec![(SessionKind::Interval, true, None)]
        );
        assert_eq!(h.rewards.calls(), 1);
    }

    #[tokio::test]
    async fn meditation_expiry_awaits_rating_and_checks_rewards_once() {
        let mut h = harness();
        h.engine.start(meditation(600)).await.unwrap();
        assert_eq!(h.engine.phase(), Phase::Active);
        assert_eq!(h.engine.state().remaining_seconds, 600);

        advance(&mut h.engine, 599);
        assert_eq!(h.engine.phase(), Phase::Active);
        let events = advance(&mut h.engine, 1);
        assert!(matches!(events[0], Event::SessionFinished { .. }));
        assert_eq!(h.engine.phase(), Phase::AwaitingRating);

        advance(&mut h.engine, 30);
        h.engine.flush().await;
        assert_eq!(h.rewards.calls(), 1);
        assert_eq!(
            h.lifecycle.finishes(),
            vec![(SessionKind::Meditation, true, None)]
        );
    }

    #[tokio::test]
    async fn rating_sends_finish_with_rating_and_finishes() {
        let mut h = harness();
        h.engine.start(meditation(1)).await.unwrap();
        advance(&mut h.engine, 1);

        assert!(matches!(
            h.engine.rate(Some(9)),
            Err(CoreError::Validation(ValidationError::RatingOutOfRange { rating: 9 }))
        ));
        assert_eq!(h.engine.phase(), Phase::AwaitingRating);

        h.engine.rate(Some(5)).unwrap();
        assert_eq!(h.engine.phase(), Phase::Finished);
        h.engine.flush().await;
        let finishes = h.lifecycle.finishes();
        assert_eq!(finishes.len(), 2);
        assert!(finishes.contains(&(SessionKind::Meditation, true, None)));
        assert!(finishes.contains(&(SessionKind::Meditation, true, Some(5))));
    }

    #[tokio::test]
    async fn rating_outside_the_prompt_names_the_operation() {
        let mut h = harness();
        assert!(matches!(
            h.engine.rate(Some(4)),
            Err(CoreError::InvalidState { operation: "rate", phase: Phase::Idle })
        ));
        h.engine.start(meditation(60)).await.unwrap();
        assert!(matches!(
            h.engine.rate(None),
            Err(CoreError::InvalidState { operation: "rate", phase: Phase::Active })
        ));
        h.engine.flush().await;
        assert!(h.lifecycle.finishes().is_empty());
    }

    #[tokio::test]
    async fn dismissing_rating_makes_no_remote_call() {
        let mut h = harness();
        h.engine.start(meditation(1)).await.unwrap();
        advance(&mut h.engine, 1);
        h.engine.rate(None).unwrap();
        assert_eq!(h.engine.phase(), Phase::Finished);
        h.engine.flush().await;
        assert_eq!(h.lifecycle.finishes().len(), 1);
    }

    #[tokio::test]
    async fn reset_from_any_phase_returns_to_idle() {
        let mut h = harness();

        h.engine.reset();
        assert_eq!(h.engine.state(), &SessionState::idle());

        h.engine.start(pomodoro()).await.unwrap();
        h.engine.reset();
        assert_eq!(h.engine.state(), &SessionState::idle());
        assert!(!h.engine.is_running());
        assert!(advance(&mut h.engine, 2000).is_empty());
        assert_eq!(h.engine.state().remaining_seconds, 0);

        h.engine.start(pomodoro()).await.unwrap();
        advance(&mut h.engine, 1500);
        assert_eq!(h.engine.phase(), Phase::Resting);
        h.engine.pause().unwrap();
        h.engine.reset();
        assert_eq!(h.engine.state(), &SessionState::idle());

        h.engine.start(meditation(1)).await.unwrap();
        advance(&mut h.engine, 1);
        h.engine.reset();
        assert_eq!(h.engine.state(), &SessionState::idle());

        h.engine.flush().await;
        // reset never closes the remote session
        assert_eq!(h.lifecycle.finishes().len(), 1);
    }

    #[tokio::test]
    async fn pause_resume_preserves_remaining_exactly() {
        let mut h = harness();
        h.engine.start(pomodoro()).await.unwrap();
        advance(&mut h.engine, 10);
        assert_eq!(h.engine.state().remaining_seconds, 1490);

        assert!(h.engine.pause().unwrap().is_some());
        assert!(h.engine.pause().unwrap().is_none());
        assert!(advance(&mut h.engine, 60).is_empty());
        assert_eq!(h.engine.state().remaining_seconds, 1490);
        assert_eq!(h.engine.phase(), Phase::Active);

        assert!(h.engine.resume().unwrap().is_some());
        assert_eq!(h.engine.state().remaining_seconds, 1490);
        advance(&mut h.engine, 1);
        assert_eq!(h.engine.state().remaining_seconds, 1489);
    }

    #[tokio::test]
    async fn pause_and_resume_outside_timed_phases_are_rejected() {
        let mut h = harness();
        assert!(matches!(
            h.engine.pause(),
            Err(CoreError::InvalidState { operation: "pause", phase: Phase::Idle })
        ));
        h.engine.start(meditation(1)).await.unwrap();
        advance(&mut h.engine, 1);
        assert!(h.engine.resume().is_err());
    }

    #[tokio::test]
    async fn transition_completes_before_pause_on_the_same_tick() {
        let mut h = harness();
        h.engine.start(pomodoro()).await.unwrap();
        advance(&mut h.engine, 1500);
        h.engine.pause().unwrap();
        assert_eq!(h.engine.phase(), Phase::Resting);
        assert_eq!(h.engine.state().remaining_seconds, 300);
        assert_eq!(h.engine.state().cycles_completed, 1);
    }

    #[tokio::test]
    async fn second_start_is_rejected_without_remote_call() {
        let mut h = harness();
        h.engine.start(pomodoro()).await.unwrap();
        let before = h.engine.state().clone();

        let err = h.engine.start(meditation(60)).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { operation: "start", .. }));
        assert_eq!(h.engine.state(), &before);
        assert_eq!(h.lifecycle.starts(), 1);
    }

    #[tokio::test]
    async fn failed_start_leaves_engine_idle() {
        let mut h = harness();
        h.lifecycle.fail_start(Some(StartFailure::Unavailable));
        let err = h.engine.start(pomodoro()).await.unwrap_err();
        assert!(matches!(err, CoreError::ServiceUnavailable(_)));
        assert_eq!(h.engine.state(), &SessionState::idle());
        assert!(!h.engine.is_running());

        h.lifecycle.fail_start(Some(StartFailure::Rejected));
        assert!(matches!(
            h.engine.start(pomodoro()).await,
            Err(CoreError::Validation(_))
        ));

        h.lifecycle.fail_start(None);
        h.engine.start(pomodoro()).await.unwrap();
        assert_eq!(h.engine.phase(), Phase::Active);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_remote_call() {
        let mut h = harness();
        let err = h.engine.start(meditation(0)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NonPositive { field: "duration_seconds" })
        ));
        assert_eq!(h.lifecycle.starts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_phase_failure_does_not_disturb_countdown() {
        let mut h = harness();
        h.lifecycle.fail_next_completes(u32::MAX);
        let mut events = h.engine.subscribe();

        h.engine.start(pomodoro()).await.unwrap();
        advance(&mut h.engine, 1500);
        advance(&mut h.engine, 100);
        assert_eq!(h.engine.phase(), Phase::Resting);
        assert_eq!(h.engine.state().remaining_seconds, 200);
        assert_eq!(h.engine.state().cycles_completed, 1);

        h.engine.flush().await;
        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if let Event::SyncFailed { operation, sequence, .. } = event {
                assert_eq!(operation, "complete_phase");
                assert_eq!(sequence, 1);
                saw_failure = true;
            }
        }
        assert!(saw_failure);
        assert_eq!(h.engine.phase(), Phase::Resting);
    }

    #[tokio::test]
    async fn configure_only_while_idle_and_applies_to_next_start() {
        let mut h = harness();
        h.engine
            .configure(&SettingsPatch {
                work_seconds: Some(50 * 60),
                ..Default::default()
            })
            .unwrap();
        h.engine.start_default(SessionKind::Interval).await.unwrap();
        assert_eq!(h.engine.state().remaining_seconds, 3000);

        let err = h
            .engine
            .configure(&SettingsPatch {
                break_seconds: Some(60),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { operation: "configure", .. }));
        assert_eq!(h.engine.defaults().interval.break_seconds, 300);
    }

    #[tokio::test]
    async fn view_tracks_state() {
        let mut h = harness();
        h.engine.start(pomodoro()).await.unwrap();
        advance(&mut h.engine, 61);
        let view = h.engine.view();
        assert_eq!(view.remaining, "23:59");
        assert_eq!(view.target_cycles, Some(4));
        assert!(view.is_running);
        h.engine.pause().unwrap();
        assert!(!h.engine.view().is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn recently_active_window() {
        let mut h = harness();
        assert!(!h.engine.recently_active(Duration::from_secs(60)));
        h.engine.start(meditation(1)).await.unwrap();
        advance(&mut h.engine, 1);
        assert!(h.engine.recently_active(Duration::from_secs(60)));
        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(!h.engine.recently_active(Duration::from_secs(60)));
    }
}
