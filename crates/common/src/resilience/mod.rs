//! Resilience patterns for outbound calls
//!
//! This module provides the two primitives the HTTP pipeline is built from:
//! - **Circuit Breaker**: tracks aggregate health of a downstream dependency
//!   and gates whether new calls are attempted, self-healing through a
//!   half-open probe state
//! - **Retry Strategy**: exponential backoff with bounded multiplicative
//!   jitter drawn from the operating system's CSPRNG
//!
//! Both are transport-agnostic. The orchestration that combines them with an
//! HTTP transport lives in `steadfast-infra`.
//!
//! ## Sharing
//!
//! A [`CircuitBreaker`] is meant to be wrapped in an `Arc` and shared by every
//! request sent to the same dependency; its state is guarded by a single
//! reader/writer lock. A [`RetryStrategy`] is immutable after construction and
//! can be read concurrently without synchronization.

pub mod circuit_breaker;
pub mod retry;

// Re-export circuit breaker types
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics,
    CircuitState, Clock, MockClock, SystemClock,
};
// Re-export retry types
pub use retry::{
    JitterSource, OsJitter, RetryStrategy, RetryStrategyConfig, RetryStrategyConfigBuilder,
};
