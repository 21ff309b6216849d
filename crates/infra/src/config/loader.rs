//! Configuration loader
//!
//! Loads [`ClientConfig`] from files and `STEADFAST_*` environment
//! variables.
//!
//! ## Loading Strategy
//! 1. Probe the standard locations for a config file; fall back to defaults
//! 2. Apply environment variable overrides
//! 3. Validate the merged result
//!
//! ## Environment Variables
//! - `STEADFAST_CB_ENABLED`: Whether the circuit breaker gates requests
//! - `STEADFAST_CB_FAILURE_THRESHOLD`: Consecutive failures before opening
//! - `STEADFAST_CB_RESET_TIMEOUT_MS`: Cool-down before a probe is admitted
//! - `STEADFAST_CB_HALF_OPEN_SUCCESSES`: Probe successes needed to close
//! - `STEADFAST_RETRY_ENABLED`: Whether failed attempts are retried
//! - `STEADFAST_RETRY_MAX_ATTEMPTS`: Total attempts including the first
//! - `STEADFAST_RETRY_INITIAL_INTERVAL_MS`: First backoff delay
//! - `STEADFAST_RETRY_MAX_INTERVAL_MS`: Upper bound for any backoff delay
//! - `STEADFAST_RETRY_MULTIPLIER`: Backoff growth factor
//! - `STEADFAST_RETRY_RANDOM_FACTOR`: Jitter amplitude in `[0, 1]`
//! - `STEADFAST_SERVER_ERROR_THRESHOLD`: Lowest status counted as a failure
//! - `STEADFAST_HTTP_TIMEOUT_MS`: Per-attempt transport timeout
//! - `STEADFAST_HTTP_USER_AGENT`: User agent sent by the default transport
//!
//! ## File Locations
//! The loader probes `steadfast.json` and `steadfast.toml` in the current
//! working directory, its parent, and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::{ClientConfig, ConfigLoadError};

/// Load configuration from the first config file found (or defaults), then
/// apply environment overrides
///
/// # Errors
/// Returns [`ConfigLoadError`] if a probed file cannot be read or parsed, an
/// environment variable holds an invalid value, or the merged configuration
/// fails validation.
pub fn load() -> Result<ClientConfig, ConfigLoadError> {
    let mut config = match probe_config_paths() {
        Some(path) => read_config_file(&path)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            ClientConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from defaults plus environment overrides only
///
/// # Errors
/// Returns [`ConfigLoadError::InvalidEnv`] for unparseable values or
/// [`ConfigLoadError::Invalid`] if validation fails.
pub fn load_from_env() -> Result<ClientConfig, ConfigLoadError> {
    let mut config = ClientConfig::default();
    apply_env_overrides(&mut config)?;
    config.validate()?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports JSON and
/// TOML (detected by file extension). Missing fields take their defaults.
///
/// # Errors
/// Returns [`ConfigLoadError`] if the file is missing, unreadable, in an
/// unsupported format, malformed, or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig, ConfigLoadError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigLoadError::NotFound(p));
            }
            p
        }
        None => probe_config_paths().ok_or(ConfigLoadError::NoConfigFile)?,
    };

    let config = read_config_file(&config_path)?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ClientConfig, ConfigLoadError> {
    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigLoadError::Read { path: path.to_path_buf(), source })?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig, ConfigLoadError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConfigLoadError::Parse { format: "TOML", message: e.to_string() }),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigLoadError::Parse { format: "JSON", message: e.to_string() }),
        other => Err(ConfigLoadError::UnsupportedFormat(other.to_string())),
    }
}

/// Overlay `STEADFAST_*` environment variables onto `config`
///
/// Unset variables leave the existing value untouched.
///
/// # Errors
/// Returns [`ConfigLoadError::InvalidEnv`] naming the first variable whose
/// value cannot be parsed.
pub fn apply_env_overrides(config: &mut ClientConfig) -> Result<(), ConfigLoadError> {
    let breaker = &mut config.circuit_breaker;
    if let Some(enabled) = env_bool("STEADFAST_CB_ENABLED")? {
        breaker.enabled = enabled;
    }
    if let Some(threshold) = env_parse::<u32>("STEADFAST_CB_FAILURE_THRESHOLD")? {
        breaker.failure_threshold = threshold;
    }
    if let Some(timeout) = env_millis("STEADFAST_CB_RESET_TIMEOUT_MS")? {
        breaker.reset_timeout = timeout;
    }
    if let Some(successes) = env_parse::<u32>("STEADFAST_CB_HALF_OPEN_SUCCESSES")? {
        breaker.half_open_success_needed = successes;
    }

    let retry = &mut config.retry;
    if let Some(enabled) = env_bool("STEADFAST_RETRY_ENABLED")? {
        retry.enabled = enabled;
    }
    if let Some(attempts) = env_parse::<u32>("STEADFAST_RETRY_MAX_ATTEMPTS")? {
        retry.max_attempts = attempts;
    }
    if let Some(interval) = env_millis("STEADFAST_RETRY_INITIAL_INTERVAL_MS")? {
        retry.initial_interval = interval;
    }
    if let Some(interval) = env_millis("STEADFAST_RETRY_MAX_INTERVAL_MS")? {
        retry.max_interval = interval;
    }
    if let Some(multiplier) = env_parse::<f64>("STEADFAST_RETRY_MULTIPLIER")? {
        retry.multiplier = multiplier;
    }
    if let Some(factor) = env_parse::<f64>("STEADFAST_RETRY_RANDOM_FACTOR")? {
        retry.random_factor = factor;
    }

    if let Some(threshold) = env_parse::<u16>("STEADFAST_SERVER_ERROR_THRESHOLD")? {
        config.server_error_threshold = threshold;
    }
    if let Some(timeout) = env_millis("STEADFAST_HTTP_TIMEOUT_MS")? {
        config.transport.timeout = timeout;
    }
    if let Ok(agent) = std::env::var("STEADFAST_HTTP_USER_AGENT") {
        config.transport.user_agent = Some(agent).filter(|a| !a.trim().is_empty());
    }

    Ok(())
}

/// Probe multiple paths for configuration files
///
/// Searches `steadfast.{json,toml}` in the current working directory, its
/// parent, and the executable's directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.into_iter()
        .flat_map(|dir| [dir.join("steadfast.json"), dir.join("steadfast.toml")])
        .find(|path| path.exists())
}

/// Parse an optional environment variable
fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigLoadError::InvalidEnv {
            key: key.to_string(),
            message: format!("{e} (got {raw:?})"),
        }),
        Err(_) => Ok(None),
    }
}

fn env_millis(key: &str) -> Result<Option<Duration>, ConfigLoadError> {
    Ok(env_parse::<u64>(key)?.map(Duration::from_millis))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str) -> Result<Option<bool>, ConfigLoadError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigLoadError::InvalidEnv {
            key: key.to_string(),
            message: format!("expected a boolean, got {raw:?}"),
        }),
    }
}
