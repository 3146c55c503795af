//! Error types for eventide.
//!
//! Every fallible operation returns `Result<T, SimError>`. Failed calls
//! leave the scheduler exactly as it was before the call began.

use thiserror::Error;

/// Result type alias for eventide operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all eventide operations.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Event Construction =====
    /// Event time failed construction-time validation (NaN or infinite).
    #[error("invalid event time {time}: timestamps must be finite numbers")]
    InvalidTime {
        /// Debug rendering of the rejected time.
        time: String,
    },

    // ===== Scheduling =====
    /// Negative time scheduled after the scheduler has been active.
    #[error("cannot schedule event at negative time {time} once the scheduler has run")]
    NegativeTime {
        /// Debug rendering of the rejected time.
        time: String,
    },

    /// `step()` called with no pending events.
    #[error("event queue is empty: nothing to step")]
    EmptyQueue,

    /// A scheduler handle outlived its scheduler.
    #[error("scheduler handle used after the scheduler was dropped")]
    SchedulerDropped,

    // ===== Configuration Errors =====
    /// Invalid configuration parameter.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid-time error from any debuggable timestamp.
    #[must_use]
    pub fn invalid_time(time: impl std::fmt::Debug) -> Self {
        Self::InvalidTime {
            time: format!("{time:?}"),
        }
    }

    /// Create a negative-time error from any debuggable timestamp.
    #[must_use]
    pub fn negative_time(time: impl std::fmt::Debug) -> Self {
        Self::NegativeTime {
            time: format!("{time:?}"),
        }
    }

    /// Whether this error came from a scheduling call rather than
    /// configuration or I/O.
    #[must_use]
    pub const fn is_scheduling_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTime { .. }
                | Self::NegativeTime { .. }
                | Self::EmptyQueue
                | Self::SchedulerDropped
        )
    }
}
