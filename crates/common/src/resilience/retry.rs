//! Exponential backoff with bounded multiplicative jitter
//!
//! [`RetryStrategy::next_backoff`] computes the delay before the next attempt
//! of a failed call:
//!
//! ```text
//! base   = initial_interval * multiplier ^ attempt
//! delay  = base * U[1 - random_factor, 1 + random_factor]
//! result = min(delay, max_interval)
//! ```
//!
//! Jitter samples come from the operating system's CSPRNG so that
//! independently started processes do not fall into lock-step retries. When
//! the entropy source is unavailable the unjittered base is used instead of
//! failing the call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::utils::serde::duration_millis;

//==============================================================================
// Jitter Source
//==============================================================================

/// Source of uniformly distributed samples in `[0, 1)`
///
/// Returning `None` signals that no randomness is available; callers fall
/// back to an unjittered delay.
pub trait JitterSource: Send + Sync + fmt::Debug {
    fn sample(&self) -> Option<f64>;
}

/// Jitter source backed by the operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsJitter;

impl JitterSource for OsJitter {
    fn sample(&self) -> Option<f64> {
        let mut bytes = [0u8; 8];
        OsRng.try_fill_bytes(&mut bytes).ok()?;
        // 53 random bits fill an f64 mantissa exactly.
        let bits = u64::from_le_bytes(bytes) >> 11;
        Some(bits as f64 / (1u64 << 53) as f64)
    }
}

//==============================================================================
// Configuration
//==============================================================================

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryStrategyConfig {
    /// Whether failed attempts are retried at all
    pub enabled: bool,
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt, before jitter
    #[serde(with = "duration_millis")]
    pub initial_interval: Duration,
    /// Upper bound for any single delay
    #[serde(with = "duration_millis")]
    pub max_interval: Duration,
    /// Growth factor applied per attempt
    pub multiplier: f64,
    /// Relative jitter amplitude in `[0, 1]`; 0 disables jitter
    pub random_factor: f64,
}

impl Default for RetryStrategyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            random_factor: 0.5,
        }
    }
}

impl RetryStrategyConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryStrategyConfigBuilder {
        RetryStrategyConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be greater than 0"));
        }

        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(ConfigError::invalid("multiplier must be a finite number greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.random_factor) {
            return Err(ConfigError::invalid("random_factor must be between 0 and 1"));
        }

        if self.initial_interval > self.max_interval {
            return Err(ConfigError::invalid("initial_interval must not exceed max_interval"));
        }

        Ok(())
    }
}

/// Builder for [`RetryStrategyConfig`] with fluent API
#[derive(Debug, Default)]
pub struct RetryStrategyConfigBuilder {
    config: RetryStrategyConfig,
}

impl RetryStrategyConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryStrategyConfig::default() }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.config.initial_interval = interval;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.config.max_interval = interval;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.multiplier = multiplier;
        self
    }

    pub fn random_factor(mut self, factor: f64) -> Self {
        self.config.random_factor = factor;
        self
    }

    pub fn no_jitter(mut self) -> Self {
        self.config.random_factor = 0.0;
        self
    }

    pub fn build(self) -> ConfigResult<RetryStrategyConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//==============================================================================
// Strategy
//==============================================================================

/// Immutable backoff calculator shared by every request of a client
#[derive(Clone)]
pub struct RetryStrategy {
    max_attempts: u32,
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    random_factor: f64,
    jitter: Arc<dyn JitterSource>,
}

impl fmt::Debug for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStrategy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_interval", &self.initial_interval)
            .field("max_interval", &self.max_interval)
            .field("multiplier", &self.multiplier)
            .field("random_factor", &self.random_factor)
            .finish()
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        let config = RetryStrategyConfig::default();
        Self {
            max_attempts: config.max_attempts,
            initial_interval: config.initial_interval,
            max_interval: config.max_interval,
            multiplier: config.multiplier,
            random_factor: config.random_factor,
            jitter: Arc::new(OsJitter),
        }
    }
}

impl RetryStrategy {
    /// Build a strategy from a validated configuration
    pub fn new(config: &RetryStrategyConfig) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            max_attempts: config.max_attempts,
            initial_interval: config.initial_interval,
            max_interval: config.max_interval,
            multiplier: config.multiplier,
            random_factor: config.random_factor,
            jitter: Arc::new(OsJitter),
        })
    }

    /// Replace the jitter source (useful for deterministic tests)
    #[must_use]
    pub fn with_jitter_source(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before the attempt following `attempt`
    ///
    /// `attempt` is the zero-based index of the attempt that just failed, so
    /// `next_backoff(0)` is the wait before the second attempt. Returns
    /// [`Duration::ZERO`] once `attempt >= max_attempts`, and never more than
    /// `max_interval`.
    pub fn next_backoff(&self, attempt: u32) -> Duration {
        if attempt >= self.max_attempts {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let mut seconds = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);

        if self.random_factor > 0.0 {
            match self.jitter.sample() {
                Some(sample) => {
                    let scale = 1.0 - self.random_factor + 2.0 * self.random_factor * sample;
                    seconds *= scale;
                }
                None => debug!(attempt, "jitter source unavailable, using unjittered backoff"),
            }
        }

        self.clamp(seconds)
    }

    fn clamp(&self, seconds: f64) -> Duration {
        if seconds.is_nan() || seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(seconds)
            .map_or(self.max_interval, |delay| delay.min(self.max_interval))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn random_factor(&self) -> f64 {
        self.random_factor
    }
}
