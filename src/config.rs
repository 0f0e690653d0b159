//! Configuration management for the dispatch throttler.

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Result, ThrottleError};
use crate::throttle::policy::{DEFAULT_DELAY_MS, DEFAULT_EXTRA_MS, DEFAULT_MAX_DELAY_MS};
use crate::throttle::throttler::DEFAULT_CAPACITY;
use crate::throttle::window::DEFAULT_PERIOD_MS;

/// Prefix for environment overrides, e.g. `DISPATCH_THROTTLE__THROTTLE__PERIOD_MS=500`.
pub const ENV_PREFIX: &str = "DISPATCH_THROTTLE";

/// Top-level configuration for the replay tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Throttler configuration
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Throttler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Name used in log lines, typically the owning session
    #[serde(default)]
    pub id: Option<String>,

    /// Maximum messages admitted per period
    #[serde(default = "default_max_messages")]
    pub max_messages_per_period: usize,

    /// Window length in milliseconds
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Slack added to a computed delay
    #[serde(default = "default_extra_ms")]
    pub extra_ms: u64,

    /// Ceiling above which a computed delay is replaced
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Delay used when the computed one is out of range
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            id: None,
            max_messages_per_period: default_max_messages(),
            period_ms: default_period_ms(),
            extra_ms: default_extra_ms(),
            max_delay_ms: default_max_delay_ms(),
            default_delay_ms: default_delay_ms(),
        }
    }
}

fn default_max_messages() -> usize {
    DEFAULT_CAPACITY
}

fn default_period_ms() -> u64 {
    DEFAULT_PERIOD_MS
}

fn default_extra_ms() -> u64 {
    DEFAULT_EXTRA_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

impl ThrottleConfig {
    /// Reject settings the throttler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_messages_per_period == 0 {
            return Err(ThrottleError::Config(
                "max_messages_per_period must be greater than zero".to_string(),
            ));
        }
        if self.period_ms == 0 {
            return Err(ThrottleError::Config(
                "period_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of plain text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.throttle.validate()?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading throttle configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Layer an optional YAML file and `DISPATCH_THROTTLE__*` environment
    /// variables over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading throttle configuration");
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.throttle.validate()?;
        Ok(config)
    }
}
