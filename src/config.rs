//! Configuration for the feedback layer.
//!
//! All values have defaults, so an empty file (or no file at all) yields a
//! working configuration. Values can be overridden from a TOML file and from
//! environment variables of the form `MEDFEEDBACK__<SECTION>__<KEY>`, e.g.
//! `MEDFEEDBACK__RETRY__MAX_RETRIES=5`.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::Anchor;
use crate::retry::RetryConfig;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "MEDFEEDBACK";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// The path could not be represented as UTF-8.
    #[error("Invalid configuration path: {0}")]
    InvalidPath(String),

    /// Parse or deserialization failure reported by the `config` crate.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] config::ConfigError),

    /// A value is syntactically valid but unusable.
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Toast defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Display time for notifications that do not set one.
    pub default_duration_ms: u64,
    /// Anchor on regular viewports.
    pub anchor: Anchor,
    /// Anchor on narrow (mobile) viewports.
    pub narrow_anchor: Anchor,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            default_duration_ms: 5000,
            anchor: Anchor::TOP_RIGHT,
            narrow_anchor: Anchor::TOP_CENTER,
        }
    }
}

impl NotificationSettings {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

/// Default button labels for dialogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogSettings {
    pub alert_confirm_label: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self {
            alert_confirm_label: "OK".to_string(),
            confirm_label: "Confirmar".to_string(),
            cancel_label: "Cancelar".to_string(),
        }
    }
}

/// Retry defaults, in milliseconds as they appear in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig::new(
            settings.max_retries,
            Duration::from_millis(settings.initial_delay_ms),
            settings.backoff_multiplier,
            Duration::from_millis(settings.max_delay_ms),
        )
    }
}

/// Settings for toasts produced from API failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorSettings {
    pub duration_ms: u64,
    pub retry_label: String,
}

impl Default for ErrorSettings {
    fn default() -> Self {
        Self {
            duration_ms: 7000,
            retry_label: "Tentar novamente".to_string(),
        }
    }
}

impl ErrorSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub notifications: NotificationSettings,
    pub dialogs: DialogSettings,
    pub retry: RetrySettings,
    pub errors: ErrorSettings,
}

impl FeedbackConfig {
    /// Loads configuration from a TOML file with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be parsed, or
    /// contains values rejected by [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path_str.to_string()));
        }

        let config = Config::builder()
            .add_source(File::new(path_str, FileFormat::Toml))
            .add_source(env_source())
            .build()?;

        Self::finish(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder().add_source(env_source()).build()?;
        Self::finish(config)
    }

    /// Parses TOML text, without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let parsed: FeedbackConfig = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Checks invariants the rest of the crate relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notifications.default_duration_ms == 0 {
            return Err(invalid(
                "notifications.default_duration_ms",
                "must be greater than zero",
            ));
        }
        if self.errors.duration_ms == 0 {
            return Err(invalid("errors.duration_ms", "must be greater than zero"));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(invalid(
                "retry.backoff_multiplier",
                format!("must be >= 1.0, got {}", self.retry.backoff_multiplier),
            ));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(invalid(
                "retry.initial_delay_ms",
                format!(
                    "{} exceeds retry.max_delay_ms ({})",
                    self.retry.initial_delay_ms, self.retry.max_delay_ms
                ),
            ));
        }
        Ok(())
    }

    /// Retry parameters as used by [`crate::retry::RetryController`].
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.retry)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
