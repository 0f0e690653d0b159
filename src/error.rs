//! Error types for the dispatch throttler.

use thiserror::Error;

/// Raised when a non-exempt message arrives while the window is full.
///
/// This is an expected control-flow signal: the caller decides what to do
/// with the refused message (typically reject it upstream).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ThrottleExceeded {
    message: String,
}

impl ThrottleExceeded {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The rejection text, e.g. `Exceeded throttle rate of 3 messages per 1000 ms`.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for throttler operations.
#[derive(Error, Debug)]
pub enum ThrottleError {
    /// Invalid throttle configuration (e.g. zero capacity)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A message was refused because the rate was exceeded
    #[error(transparent)]
    Exceeded(#[from] ThrottleExceeded),

    /// An operation this throttler deliberately does not provide
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Layered settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// YAML parse errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for throttler operations.
pub type Result<T> = std::result::Result<T, ThrottleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exceeded_displays_bare_message() {
        let err = ThrottleExceeded::new("Exceeded throttle rate of 3 messages per 1000 ms");
        assert_eq!(err.to_string(), "Exceeded throttle rate of 3 messages per 1000 ms");

        let wrapped: ThrottleError = err.into();
        assert_eq!(
            wrapped.to_string(),
            "Exceeded throttle rate of 3 messages per 1000 ms"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ThrottleError::Config("capacity must be positive".to_string());
        assert_eq!(err.to_string(), "Configuration error: capacity must be positive");
    }
}
