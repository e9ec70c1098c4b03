//! Session runtime: the task that owns a `SessionEngine`.
//!
//! The engine lives inside one tokio task, so ticks and commands never
//! interleave and no lock guards the session. The presentation layer talks
//! to it through a `SessionHandle`. When the last handle is dropped (view
//! unmounted) or `shutdown()` is called, the task disarms the clock, waits
//! for in-flight sync and exits. There is no global timer.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::config::{SessionConfig, SessionKind, SettingsPatch};
use super::engine::SessionEngine;
use super::state::SessionView;
use crate::error::{CoreError, Result};
use crate::events::Event;

const CHANNEL_CAPACITY: usize = 32;
const TICK: Duration = Duration::from_secs(1);

/// Background reward polling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub reward_poll_interval: Duration,
    /// Keep polling this long after the last session activity.
    pub recent_activity: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            reward_poll_interval: Duration::from_secs(5 * 60),
            recent_activity: Duration::from_secs(15 * 60),
        }
    }
}

enum Command {
    Start {
        config: SessionConfig,
        reply: oneshot::Sender<Result<Event>>,
    },
    StartDefault {
        kind: SessionKind,
        reply: oneshot::Sender<Result<Event>>,
    },
    Pause {
        reply: oneshot::Sender<Result<Option<Event>>>,
    },
    Resume {
        reply: oneshot::Sender<Result<Option<Event>>>,
    },
    Reset {
        reply: oneshot::Sender<Result<Event>>,
    },
    Configure {
        patch: SettingsPatch,
        reply: oneshot::Sender<Result<()>>,
    },
    Rate {
        rating: Option<u8>,
        reply: oneshot::Sender<Result<Event>>,
    },
    CheckRewards,
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub struct SessionRuntime {
    engine: SessionEngine,
    options: RuntimeOptions,
    commands: mpsc::Receiver<Command>,
    view: watch::Sender<SessionView>,
}

impl SessionRuntime {
    /// Move `engine` into a new task and return a handle to it.
    pub fn spawn(engine: SessionEngine, options: RuntimeOptions) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (view_tx, view_rx) = watch::channel(engine.view());
        let events = engine.event_sender();

        let runtime = Self {
            engine,
            options,
            commands: rx,
            view: view_tx,
        };
        let task = tokio::spawn(runtime.run());
        let handle = SessionHandle {
            commands: tx,
            view: view_rx,
            events,
        };
        (handle, task)
    }

    async fn run(mut self) {
        debug!("session runtime started");
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval_at panics on a zero period.
        let poll = self.options.reward_poll_interval.max(TICK);
        let mut reward_timer = interval_at(Instant::now() + poll, poll);

        let mut shutdown_reply = None;
        loop {
            tokio::select! {
                biased;

                cmd = self.commands.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("all session handles dropped");
                        break;
                    };
                    let was_running = self.engine.is_running();
                    match cmd {
                        Command::Shutdown { reply } => {
                            shutdown_reply = Some(reply);
                            break;
                        }
                        cmd => self.handle(cmd).await,
                    }
                    if !was_running && self.engine.is_running() {
                        // First decrement lands one full second after (re)arming.
                        ticker.reset();
                    }
                    self.publish();
                }

                _ = ticker.tick(), if self.engine.is_running() => {
                    self.engine.tick();
                    self.publish();
                }

                _ = reward_timer.tick() => {
                    if self.engine.recently_active(self.options.recent_activity) {
                        self.engine.check_rewards();
                    }
                }
            }
        }

        self.commands.close();
        self.engine.shutdown().await;
        self.publish();
        debug!("session runtime stopped");
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start { config, reply } => {
                let _ = reply.send(self.engine.start(config).await);
            }
            Command::StartDefault { kind, reply } => {
                let _ = reply.send(self.engine.start_default(kind).await);
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.engine.pause());
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.engine.resume());
            }
            Command::Reset { reply } => {
                let _ = reply.send(Ok(self.engine.reset()));
            }
            Command::Configure { patch, reply } => {
                let _ = reply.send(self.engine.configure(&patch));
            }
            Command::Rate { rating, reply } => {
                let _ = reply.send(self.engine.rate(rating));
            }
            Command::CheckRewards => self.engine.check_rewards(),
            Command::Shutdown { .. } => {}
        }
    }

    fn publish(&self) {
        self.view.send_replace(self.engine.view());
    }
}

/// Cloneable handle to a running session. Dropping every clone tears the
/// session down.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
    events: broadcast::Sender<Event>,
}

impl SessionHandle {
    pub async fn start(&self, config: SessionConfig) -> Result<Event> {
        self.request(|reply| Command::Start { config, reply }).await?
    }

    pub async fn start_default(&self, kind: SessionKind) -> Result<Event> {
        self.request(|reply| Command::StartDefault { kind, reply })
            .await?
    }

    pub async fn pause(&self) -> Result<Option<Event>> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<Option<Event>> {
        self.request(|reply| Command::Resume { reply }).await?
    }

    pub async fn reset(&self) -> Result<Event> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    pub async fn configure(&self, patch: SettingsPatch) -> Result<()> {
        self.request(|reply| Command::Configure { patch, reply })
            .await?
    }

    pub async fn rate(&self, rating: Option<u8>) -> Result<Event> {
        self.request(|reply| Command::Rate { rating, reply }).await?
    }

    /// Ask for an immediate reward check (fire-and-forget).
    pub async fn check_rewards(&self) -> Result<()> {
        self.commands
            .send(Command::CheckRewards)
            .await
            .map_err(|_| CoreError::RuntimeStopped)
    }

    /// Latest published view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change (each tick and command).
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stop the runtime and wait until it has torn down.
    pub async fn shutdown(self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| CoreError::RuntimeStopped)?;
        response.await.map_err(|_| CoreError::RuntimeStopped)
    }
}
