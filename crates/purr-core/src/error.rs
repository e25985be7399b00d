//! Error types for the Purr control loop

use thiserror::Error;

/// Core Purr errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PurrError {
    // Configuration errors
    #[error("Invalid configuration: {field} {reason}")]
    ConfigInvalid { field: &'static str, reason: String },

    #[error("Invalid range for {name}: min {min} > max {max}")]
    InvalidRange { name: &'static str, min: f64, max: f64 },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Configuration I/O error: {0}")]
    ConfigIo(String),

    // Runtime errors
    #[error("Event queue full, event dropped")]
    EventQueueFull,

    #[error("Controller is not running")]
    NotRunning,

    #[error("Controller task failed: {0}")]
    TaskFailed(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl PurrError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        PurrError::ConfigInvalid {
            field,
            reason: reason.into(),
        }
    }

    /// True for errors raised while validating or loading configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PurrError::ConfigInvalid { .. }
                | PurrError::InvalidRange { .. }
                | PurrError::ConfigParse(_)
                | PurrError::ConfigIo(_)
        )
    }
}

/// Result type for Purr operations
pub type PurrResult<T> = Result<T, PurrError>;
