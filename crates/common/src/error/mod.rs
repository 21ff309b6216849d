//! Common error types and classification utilities
//!
//! Every error surfaced by Steadfast crates implements
//! [`ErrorClassification`] so callers can make uniform degrade/retry
//! decisions without matching on crate-specific variants.
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Caller cancelled a request |
//! | **Warning** | Degraded but operational | Circuit open, transient transport failures |
//! | **Error** | Failure requiring attention | Retries exhausted, invalid configuration |
//! | **Critical** | System integrity at risk | Internal invariant violations |
//!
//! ## Example
//!
//! ```rust,ignore
//! use steadfast_common::error::ErrorClassification;
//!
//! match client.get(&ctx, url).await {
//!     Ok(response) => handle(response).await,
//!     Err(err) if err.is_retryable() => schedule_later(err.retry_after()),
//!     Err(err) => return Err(err.into()),
//! }
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    /// Create an invalid-configuration error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are typically transient issues that may succeed if
    /// attempted again, such as:
    /// - Network timeouts
    /// - Circuit breaker open states
    /// - Temporary service unavailability
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    ///
    /// Used for monitoring, alerting, and logging decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when a specific retry delay is recommended
    /// (e.g. the time left before an open circuit admits a probe), or `None`
    /// if no specific delay is suggested.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for ConfigError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error classification primitives

    use super::*;

    /// Validates `ErrorSeverity` display labels and ordering.
    ///
    /// Assertions:
    /// - Confirms each severity renders its uppercase label.
    /// - Ensures `Info < Warning < Error < Critical`.
    #[test]
    fn test_error_severity_display_and_ordering() {
        assert_eq!(ErrorSeverity::Info.to_string(), "INFO");
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
        assert_eq!(ErrorSeverity::Error.to_string(), "ERROR");
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");

        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }

    /// Validates `ConfigError::invalid` classification.
    ///
    /// Assertions:
    /// - Confirms the message is carried into `Display`.
    /// - Ensures configuration errors are neither retryable nor critical.
    #[test]
    fn test_config_error_classification() {
        let err = ConfigError::invalid("failure_threshold must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: failure_threshold must be greater than 0"
        );
        assert!(!err.is_retryable());
        assert!(!err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert_eq!(err.retry_after(), None);
    }
}
