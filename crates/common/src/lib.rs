//! Resilience primitives shared across Steadfast crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors, serde helpers
//! - `observability`: tracing support (not included by default)
//! - `runtime`: circuit breaker, retry strategy and resilience observers
//! - `test-utils`: recording observers for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod observability;
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ConfigError, ConfigResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use observability::{
    AttemptOutcome, AttemptRecord, NoopObserver, ResilienceObserver, StateTransition,
    TracingObserver,
};
#[cfg(feature = "runtime")]
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics,
    CircuitState, Clock, JitterSource, MockClock, OsJitter, RetryStrategy, RetryStrategyConfig,
    RetryStrategyConfigBuilder, SystemClock,
};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
