//! Session configuration.
//!
//! A `SessionConfig` is an immutable snapshot taken when a session starts.
//! Edits go through `SessionDefaults::apply`, which only affects the next
//! session.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Interval,
    Meditation,
}

/// Work/break cycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalConfig {
    #[serde(default = "default_work_seconds")]
    pub work_seconds: u64,
    #[serde(default = "default_break_seconds")]
    pub break_seconds: u64,
    #[serde(default = "default_target_cycles")]
    pub target_cycles: u32,
    /// Finish the session once `target_cycles` work phases are done.
    /// Off by default: the counter is informational and cycles continue.
    #[serde(default)]
    pub auto_stop_at_target: bool,
}

/// Single-phase meditation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeditationConfig {
    #[serde(default = "default_meditation_seconds")]
    pub duration_seconds: u64,
    /// Free-form label (e.g. "mindfulness"); the server decides what is valid.
    #[serde(default = "default_variant")]
    pub variant: String,
}

fn default_work_seconds() -> u64 {
    25 * 60
}
fn default_break_seconds() -> u64 {
    5 * 60
}
fn default_target_cycles() -> u32 {
    4
}
fn default_meditation_seconds() -> u64 {
    10 * 60
}
fn default_variant() -> String {
    "mindfulness".into()
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            work_seconds: default_work_seconds(),
            break_seconds: default_break_seconds(),
            target_cycles: default_target_cycles(),
            auto_stop_at_target: false,
        }
    }
}

impl Default for MeditationConfig {
    fn default() -> Self {
        Self {
            duration_seconds: default_meditation_seconds(),
            variant: default_variant(),
        }
    }
}

impl IntervalConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.work_seconds == 0 {
            return Err(ValidationError::NonPositive {
                field: "work_seconds",
            });
        }
        if self.break_seconds == 0 {
            return Err(ValidationError::NonPositive {
                field: "break_seconds",
            });
        }
        if self.target_cycles == 0 {
            return Err(ValidationError::NonPositive {
                field: "target_cycles",
            });
        }
        Ok(())
    }
}

impl MeditationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_seconds == 0 {
            return Err(ValidationError::NonPositive {
                field: "duration_seconds",
            });
        }
        if self.variant.trim().is_empty() {
            return Err(ValidationError::EmptyVariant);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SessionConfig {
    Interval(IntervalConfig),
    Meditation(MeditationConfig),
}

impl SessionConfig {
    pub fn kind(&self) -> SessionKind {
        match self {
            SessionConfig::Interval(_) => SessionKind::Interval,
            SessionConfig::Meditation(_) => SessionKind::Meditation,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            SessionConfig::Interval(cfg) => cfg.validate(),
            SessionConfig::Meditation(cfg) => cfg.validate(),
        }
    }

    /// Length of the first phase.
    pub fn initial_seconds(&self) -> u64 {
        match self {
            SessionConfig::Interval(cfg) => cfg.work_seconds,
            SessionConfig::Meditation(cfg) => cfg.duration_seconds,
        }
    }
}

/// Defaults used by the next `start`, one per session kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default)]
    pub interval: IntervalConfig,
    #[serde(default)]
    pub meditation: MeditationConfig,
}

impl SessionDefaults {
    pub fn config_for(&self, kind: SessionKind) -> SessionConfig {
        match kind {
            SessionKind::Interval => SessionConfig::Interval(self.interval.clone()),
            SessionKind::Meditation => SessionConfig::Meditation(self.meditation.clone()),
        }
    }

    /// Merge `patch` into a copy of these defaults and validate the result.
    ///
    /// Nothing changes if validation fails.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<SessionDefaults, ValidationError> {
        let mut next = self.clone();
        if let Some(v) = patch.work_seconds {
            next.interval.work_seconds = v;
        }
        if let Some(v) = patch.break_seconds {
            next.interval.break_seconds = v;
        }
        if let Some(v) = patch.target_cycles {
            next.interval.target_cycles = v;
        }
        if let Some(v) = patch.auto_stop_at_target {
            next.interval.auto_stop_at_target = v;
        }
        if let Some(v) = patch.meditation_seconds {
            next.meditation.duration_seconds = v;
        }
        if let Some(ref v) = patch.meditation_variant {
            next.meditation.variant = v.clone();
        }
        next.interval.validate()?;
        next.meditation.validate()?;
        Ok(next)
    }
}

/// Partial settings update. Every recognized option is listed; `None`
/// leaves the current default untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub work_seconds: Option<u64>,
    #[serde(default)]
    pub break_seconds: Option<u64>,
    #[serde(default)]
    pub target_cycles: Option<u32>,
    #[serde(default)]
    pub auto_stop_at_target: Option<bool>,
    #[serde(default)]
    pub meditation_seconds: Option<u64>,
    #[serde(default)]
    pub meditation_variant: Option<String>,
}
