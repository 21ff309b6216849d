//! Client configuration and loading
//!
//! [`ClientConfig`] groups every knob of the resilient pipeline. Values can
//! be built in code, deserialized from JSON/TOML, or loaded through
//! [`loader`] with `STEADFAST_*` environment overrides.

pub mod loader;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use steadfast_common::error::{ConfigError, ConfigResult};
use steadfast_common::resilience::{CircuitBreakerConfig, RetryStrategyConfig};
use steadfast_common::utils::serde::duration_millis;
use thiserror::Error;

// Re-export commonly used items
pub use loader::{apply_env_overrides, load, load_from_env, load_from_file, probe_config_paths};

/// Responses with a status at or above this value count as failures.
pub const DEFAULT_SERVER_ERROR_THRESHOLD: u16 = 500;

/// Settings for the default reqwest-backed transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Total timeout for a single attempt
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    /// Connection phase timeout; zero leaves it unbounded
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), connect_timeout: Duration::ZERO, user_agent: None }
    }
}

/// Complete configuration of a [`crate::http::Client`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryStrategyConfig,
    pub server_error_threshold: u16,
    pub transport: TransportConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryStrategyConfig::default(),
            server_error_threshold: DEFAULT_SERVER_ERROR_THRESHOLD,
            transport: TransportConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.circuit_breaker.validate()?;
        self.retry.validate()?;
        validate_server_error_threshold(self.server_error_threshold)?;
        if self.transport.timeout.is_zero() {
            return Err(ConfigError::invalid("transport timeout must be greater than 0"));
        }
        Ok(())
    }
}

pub(crate) fn validate_server_error_threshold(threshold: u16) -> ConfigResult<()> {
    if !(100..=599).contains(&threshold) {
        return Err(ConfigError::invalid(format!(
            "server_error_threshold must be a valid HTTP status (100-599), got {threshold}"
        )));
    }
    Ok(())
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no config file found in any of the standard locations")]
    NoConfigFile,

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {format} format: {message}")]
    Parse { format: &'static str, message: String },

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid value for {key}: {message}")]
    InvalidEnv { key: String, message: String },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}
