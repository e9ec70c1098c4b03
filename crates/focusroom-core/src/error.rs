//! Core error types for focusroom-core.
//!
//! This module defines the error hierarchy using thiserror. Remote failures
//! are folded into a small taxonomy so the presentation layer only has to
//! distinguish "fix your input", "sign in again" and "try again later".

use std::path::PathBuf;
use thiserror::Error;

use crate::session::Phase;

/// Core error type for focusroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bad session configuration, rejected locally or by the server.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Transport failure or non-success reply from a remote service.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The remote service refused the bearer credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Desktop notification could not be shown. Never surfaced to callers
    /// of the session engine.
    #[error("Notification unavailable: {0}")]
    NotificationUnavailable(String),

    /// Operation is not valid in the current phase.
    #[error("Cannot {operation} while session is {phase:?}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },

    /// The session runtime task has already stopped.
    #[error("Session runtime is no longer running")]
    RuntimeStopped,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether a failed remote call is worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ServiceUnavailable(_))
    }
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A duration or count that must be positive was zero.
    #[error("'{field}' must be greater than zero")]
    NonPositive { field: &'static str },

    /// Meditation variant label is blank.
    #[error("meditation variant must not be empty")]
    EmptyVariant,

    /// Session rating outside the accepted range.
    #[error("rating {rating} is out of range (1-5)")]
    RatingOutOfRange { rating: u8 },

    /// The server rejected the request payload.
    #[error("rejected by server: {0}")]
    Rejected(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home/config directory could not be resolved or created
    #[error("Configuration directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::ServiceUnavailable(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
