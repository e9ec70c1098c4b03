//! Interactive interval and meditation sessions.
//!
//! The countdown is rendered on a single status line. Single-letter commands
//! are read from stdin, one per line:
//!
//! ```text
//! p  pause        r  resume       x  reset and exit
//! q  quit         1-5  rate       s  skip rating
//! ```

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use focusroom_core::{
    Config, Event, MeditationVariant, NotificationDispatcher, Phase, PhaseLabel, SessionEngine,
    SessionHandle, SessionKind, SessionRuntime, SessionView, SettingsPatch,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::{connect, describe, Services};
use crate::notifier::DesktopNotifier;

#[derive(Args)]
pub struct IntervalArgs {
    /// Work phase length in seconds
    #[arg(long = "work", value_name = "SECONDS")]
    pub work_seconds: Option<u64>,
    /// Break phase length in seconds
    #[arg(long = "break", value_name = "SECONDS")]
    pub break_seconds: Option<u64>,
    /// Target number of work cycles
    #[arg(long)]
    pub cycles: Option<u32>,
    /// Finish the session once the target is reached
    #[arg(long)]
    pub auto_stop: bool,
}

#[derive(Args)]
pub struct MeditateArgs {
    /// Meditation length in seconds
    #[arg(long = "duration", value_name = "SECONDS")]
    pub duration_seconds: Option<u64>,
    /// Meditation variant (e.g. mindfulness, breathing)
    #[arg(long)]
    pub variant: Option<String>,
    /// Print the variants offered by the server and exit
    #[arg(long, conflicts_with_all = ["duration_seconds", "variant"])]
    pub list_variants: bool,
}

impl IntervalArgs {
    fn patch(&self) -> SettingsPatch {
        SettingsPatch {
            work_seconds: self.work_seconds,
            break_seconds: self.break_seconds,
            target_cycles: self.cycles,
            auto_stop_at_target: self.auto_stop.then_some(true),
            ..Default::default()
        }
    }
}

impl MeditateArgs {
    fn patch(&self) -> SettingsPatch {
        SettingsPatch {
            meditation_seconds: self.duration_seconds,
            meditation_variant: self.variant.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Pause,
    Resume,
    Reset,
    Quit,
    Rate(u8),
    Skip,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

fn parse_key(line: &str) -> Option<Key> {
    match line.trim() {
        "p" => Some(Key::Pause),
        "r" => Some(Key::Resume),
        "x" => Some(Key::Reset),
        "q" => Some(Key::Quit),
        "s" => Some(Key::Skip),
        other => other
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=5).contains(n))
            .map(Key::Rate),
    }
}

pub async fn run_interval(args: IntervalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let services = connect(&config).map_err(|e| describe(&e))?;
    run(SessionKind::Interval, args.patch(), config, services).await
}

pub async fn run_meditation(args: MeditateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let services = connect(&config).map_err(|e| describe(&e))?;

    if args.list_variants {
        let variants = services
            .lifecycle
            .variants()
            .await
            .map_err(|e| describe(&e))?;
        for variant in &variants {
            println!("{}", variant_line(variant));
        }
        return Ok(());
    }

    if let Some(requested) = &args.variant {
        // An unreachable catalogue leaves the decision to the server's start call.
        match services.lifecycle.variants().await {
            Ok(offered) => {
                if let Some(msg) = unknown_variant(requested, &offered) {
                    return Err(msg.into());
                }
            }
            Err(e) => debug!(error = %e, "meditation variants unavailable"),
        }
    }

    run(SessionKind::Meditation, args.patch(), config, services).await
}

fn variant_line(variant: &MeditationVariant) -> String {
    match &variant.description {
        Some(desc) => format!("{:<16} {desc}", variant.name),
        None => variant.name.clone(),
    }
}

/// Error line for a variant the server does not offer. An empty catalogue
/// accepts anything.
fn unknown_variant(requested: &str, offered: &[MeditationVariant]) -> Option<String> {
    if offered.is_empty()
        || offered
            .iter()
            .any(|v| v.name.eq_ignore_ascii_case(requested))
    {
        return None;
    }
    let names: Vec<&str> = offered.iter().map(|v| v.name.as_str()).collect();
    Some(format!(
        "unknown meditation variant '{requested}'; available: {}",
        names.join(", ")
    ))
}

async fn run(
    kind: SessionKind,
    patch: SettingsPatch,
    config: Config,
    services: Services,
) -> Result<(), Box<dyn std::error::Error>> {
    let notifier = if config.notifications.enabled {
        NotificationDispatcher::new(Arc::new(DesktopNotifier::new()))
    } else {
        NotificationDispatcher::disabled()
    };
    let engine = SessionEngine::new(
        services.lifecycle,
        services.rewards,
        notifier,
        config.session_defaults(),
        config.sync,
    );
    let (handle, task) = SessionRuntime::spawn(engine, config.runtime_options());
    let mut events = handle.subscribe();

    let result = drive(&handle, kind, patch, &mut events).await;

    handle.shutdown().await;
    let _ = task.await;
    // Background sync may have reported after the loop ended.
    while let Ok(event) = events.try_recv() {
        if let Some(msg) = event_message(&event) {
            println!("{msg}");
        }
    }
    result
}

async fn drive(
    handle: &SessionHandle,
    kind: SessionKind,
    patch: SettingsPatch,
    events: &mut broadcast::Receiver<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    handle.configure(patch).await.map_err(|e| describe(&e))?;
    handle
        .start_default(kind)
        .await
        .map_err(|e| describe(&e))?;
    println!("p pause | r resume | x reset | q quit");

    let mut view = handle.watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    draw(&render(kind, &view.borrow_and_update()));

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                draw(&render(kind, &current));
            }

            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(msg) = event_message(&event) {
                        println!("\n{msg}");
                    }
                    if ends_session(&event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "session events lagged"),
                Err(RecvError::Closed) => break,
            },

            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match parse_key(&line) {
                    Some(key) => {
                        if apply(handle, key).await == Flow::Exit {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("unknown command: {}", line.trim()),
                },
                None => stdin_open = false,
            },
        }
    }
    println!();
    Ok(())
}

async fn apply(handle: &SessionHandle, key: Key) -> Flow {
    let result = match key {
        Key::Pause => handle.pause().await.map(|_| ()),
        Key::Resume => handle.resume().await.map(|_| ()),
        Key::Reset => handle.reset().await.map(|_| ()),
        Key::Quit => return Flow::Exit,
        Key::Rate(n) => handle.rate(Some(n)).await.map(|_| ()),
        Key::Skip => handle.rate(None).await.map(|_| ()),
    };
    if let Err(e) = result {
        println!("\n{}", describe(&e));
    }
    Flow::Continue
}

fn draw(line: &str) {
    let mut out = std::io::stdout();
    let _ = write!(out, "\r{line:<40}");
    let _ = out.flush();
}

fn render(kind: SessionKind, view: &SessionView) -> String {
    let label = match (kind, view.phase) {
        (SessionKind::Interval, Phase::Active) => "Work",
        (SessionKind::Interval, Phase::Resting) => "Break",
        (SessionKind::Meditation, Phase::Active) => "Meditation",
        (_, Phase::AwaitingRating) => "Rate 1-5 or s",
        (_, Phase::Finished) => "Done",
        (_, _) => "Idle",
    };
    let mut line = format!("[{label}] {}", view.remaining);
    if let Some(target) = view.target_cycles {
        line.push_str(&format!("  cycles {}/{target}", view.cycles_completed));
    }
    if view.phase.is_timed() && !view.is_running {
        line.push_str("  (paused)");
    }
    line
}

fn event_message(event: &Event) -> Option<String> {
    match event {
        Event::PhaseCompleted {
            completed: PhaseLabel::Work,
            cycles_completed,
            ..
        } => Some(format!(
            "Work phase complete ({cycles_completed} done). Time for a break."
        )),
        Event::PhaseCompleted { .. } => Some("Break is over. Back to work.".into()),
        Event::SessionFinished {
            kind: SessionKind::Meditation,
            ..
        } => Some("Meditation complete. Rate it 1-5, or press s to skip.".into()),
        Event::SessionFinished { cycles_completed, .. } => {
            Some(format!("Target reached after {cycles_completed} cycles."))
        }
        Event::Rated {
            rating: Some(r), ..
        } => Some(format!("Thanks! Rated {r}/5.")),
        Event::Rated { rating: None, .. } => Some("Rating skipped.".into()),
        Event::SyncFailed {
            operation, message, ..
        } => Some(format!(
            "warning: could not sync {operation} ({message}); the timer is unaffected"
        )),
        Event::RewardsGranted { rewards, .. } => Some(
            rewards
                .iter()
                .map(|r| format!("Reward unlocked: {}", r.name))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

fn ends_session(event: &Event) -> bool {
    matches!(
        event,
        Event::Rated { .. }
            | Event::Reset { .. }
            | Event::SessionFinished {
                kind: SessionKind::Interval,
                ..
            }
    )
}
