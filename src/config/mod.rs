//! Scheduler configuration with YAML loading and validation.
//!
//! Mistake-proofing through:
//! - Type-safe configuration structs
//! - Unknown keys rejected by serde
//! - Range checks via `validator`

use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::error::{SimError, SimResult};

/// Upper bound on preallocated queue or log slots.
pub const MAX_PREALLOCATION: usize = 1 << 24;

/// Scheduler configuration.
///
/// # Example
///
/// ```rust
/// use eventide::config::SchedulerConfig;
///
/// let config = SchedulerConfig::from_yaml("name: bank\nqueue_capacity: 256\n").unwrap();
/// assert_eq!(config.name, "bank");
/// assert_eq!(config.queue_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Name recorded on tracing spans.
    #[validate(length(min = 1, max = 64))]
    #[serde(default = "default_name")]
    pub name: String,

    /// Pending events to preallocate room for.
    #[validate(range(max = 16_777_216))]
    #[serde(default)]
    pub queue_capacity: usize,

    /// Logged events to preallocate room for.
    #[validate(range(max = 16_777_216))]
    #[serde(default)]
    pub log_capacity: usize,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_name() -> String {
    "eventide".to_string()
}

impl SchedulerConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;

        config.validate()?;
        config.validate_semantic()?;

        Ok(config)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Validate constraints the derive cannot express.
    fn validate_semantic(&self) -> SimResult<()> {
        if self.name.trim().is_empty() {
            return Err(SimError::config("Scheduler name must not be blank"));
        }

        if self.name.chars().any(char::is_control) {
            return Err(SimError::config(
                "Scheduler name must not contain control characters",
            ));
        }

        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: default_name(),
            queue_capacity: 0,
            log_capacity: 0,
        }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    name: Option<String>,
    queue_capacity: Option<usize>,
    log_capacity: Option<usize>,
}

impl SchedulerConfigBuilder {
    /// Set the scheduler name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the queue preallocation, clamped to [`MAX_PREALLOCATION`].
    #[must_use]
    pub const fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set the log preallocation, clamped to [`MAX_PREALLOCATION`].
    #[must_use]
    pub const fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = Some(capacity);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SchedulerConfig {
        let mut config = SchedulerConfig::default();

        if let Some(name) = self.name {
            config.name = name;
        }

        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity.min(MAX_PREALLOCATION);
        }

        if let Some(capacity) = self.log_capacity {
            config.log_capacity = capacity.min(MAX_PREALLOCATION);
        }

        config
    }
}
