//! Testing utilities and helpers
//!
//! - **[`assertions`]**: Duration assertions for backoff tests
//! - **[`mocks`]**: Recording observer and deterministic jitter sources
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use steadfast_common::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use steadfast_common::testing::RecordingObserver;
//!
//! let observer = Arc::new(RecordingObserver::new());
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig::default())
//!     .expect("default config is valid")
//!     .with_observer(observer.clone());
//! breaker.on_failure();
//! assert!(observer.transitions().is_empty());
//! ```

pub mod assertions;
pub mod mocks;

// Re-export commonly used items
pub use assertions::{assert_duration_between, assert_duration_in_range};
pub use mocks::{FailingJitter, FixedJitter, RecordingObserver};
