//! Trait abstractions for observing resilience behavior
//!
//! These traits let the circuit breaker and the retry loop report state
//! transitions and attempts without depending on a specific metrics or
//! logging backend.

use std::fmt::{self, Debug};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::resilience::CircuitState;

// ============================================================================
// Events
// ============================================================================

/// A circuit breaker state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateTransition {
    pub from: CircuitState,
    pub to: CircuitState,
}

impl fmt::Display for StateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// How a single attempt of a logical request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A response below the server error threshold
    Success { status: u16 },
    /// A response at or above the server error threshold
    ServerError { status: u16 },
    /// The transport failed before producing a response
    TransportError { message: String },
}

impl AttemptOutcome {
    /// Whether the attempt counted as a failure
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Success { .. })
    }
}

/// One attempt of a logical request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Zero-based attempt index
    pub attempt: u32,
    pub method: String,
    pub url: String,
    pub outcome: AttemptOutcome,
    /// Delay scheduled before the next attempt, if one will be made
    pub backoff: Option<Duration>,
    /// Wall time spent in the inner transport for this attempt
    pub elapsed: Duration,
}

// ============================================================================
// Observer Trait
// ============================================================================

/// Sink for resilience events
///
/// Implementations must be cheap and non-blocking; they are called inline on
/// the request path (never while the breaker lock is held).
pub trait ResilienceObserver: Send + Sync + Debug {
    /// Record the outcome of one attempt
    fn record_attempt(&self, record: &AttemptRecord);

    /// Record a circuit breaker state transition
    fn record_state_transition(&self, transition: &StateTransition);

    /// Record a call rejected without being attempted
    fn record_rejection(&self, _state: CircuitState) {}
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ResilienceObserver for NoopObserver {
    fn record_attempt(&self, _record: &AttemptRecord) {}

    fn record_state_transition(&self, _transition: &StateTransition) {}
}

/// Observer that emits structured `tracing` events
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    dependency: Option<String>,
}

impl TracingObserver {
    /// Create a tracing observer without a dependency label
    pub fn new() -> Self {
        Self::default()
    }

    /// Label every event with the name of the guarded dependency
    pub fn for_dependency(name: impl Into<String>) -> Self {
        Self { dependency: Some(name.into()) }
    }

    fn dependency(&self) -> &str {
        self.dependency.as_deref().unwrap_or("default")
    }
}

impl ResilienceObserver for TracingObserver {
    fn record_attempt(&self, record: &AttemptRecord) {
        let backoff_ms = record.backoff.map(|d| d.as_millis());
        match &record.outcome {
            AttemptOutcome::Success { status } => debug!(
                dependency = self.dependency(),
                attempt = record.attempt,
                method = %record.method,
                url = %record.url,
                status,
                elapsed_ms = record.elapsed.as_millis(),
                "attempt succeeded"
            ),
            AttemptOutcome::ServerError { status } => warn!(
                dependency = self.dependency(),
                attempt = record.attempt,
                method = %record.method,
                url = %record.url,
                status,
                backoff_ms,
                "attempt returned server error"
            ),
            AttemptOutcome::TransportError { message } => warn!(
                dependency = self.dependency(),
                attempt = record.attempt,
                method = %record.method,
                url = %record.url,
                error = %message,
                backoff_ms,
                "attempt failed"
            ),
        }
    }

    fn record_state_transition(&self, transition: &StateTransition) {
        info!(
            dependency = self.dependency(),
            from = %transition.from,
            to = %transition.to,
            "circuit breaker state changed"
        );
    }

    fn record_rejection(&self, state: CircuitState) {
        debug!(dependency = self.dependency(), %state, "call rejected by circuit breaker");
    }
}
