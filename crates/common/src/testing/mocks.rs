//! Mock implementations of resilience traits
//!
//! Provides deterministic stand-ins for tests.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::observability::{AttemptRecord, ResilienceObserver, StateTransition};
use crate::resilience::{CircuitState, JitterSource};

/// Observer that keeps every event in memory
///
/// # Examples
///
/// ```
/// use steadfast_common::observability::{ResilienceObserver, StateTransition};
/// use steadfast_common::resilience::CircuitState;
/// use steadfast_common::testing::RecordingObserver;
///
/// let observer = RecordingObserver::new();
/// observer.record_state_transition(&StateTransition {
///     from: CircuitState::Closed,
///     to: CircuitState::Open,
/// });
/// assert_eq!(observer.transitions().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingObserver {
    attempts: Mutex<Vec<AttemptRecord>>,
    transitions: Mutex<Vec<StateTransition>>,
    rejections: AtomicU64,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attempt recorded so far, in completion order
    #[must_use]
    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.attempts.lock().clone()
    }

    /// Every state transition recorded so far
    #[must_use]
    pub fn transitions(&self) -> Vec<StateTransition> {
        self.transitions.lock().clone()
    }

    /// Number of calls rejected by an open circuit
    #[must_use]
    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Acquire)
    }

    /// Number of recorded attempts that counted as failures
    #[must_use]
    pub fn failed_attempts(&self) -> usize {
        self.attempts.lock().iter().filter(|a| a.outcome.is_failure()).count()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.attempts.lock().clear();
        self.transitions.lock().clear();
        self.rejections.store(0, Ordering::Release);
    }
}

impl ResilienceObserver for RecordingObserver {
    fn record_attempt(&self, record: &AttemptRecord) {
        self.attempts.lock().push(record.clone());
    }

    fn record_state_transition(&self, transition: &StateTransition) {
        self.transitions.lock().push(*transition);
    }

    fn record_rejection(&self, _state: CircuitState) {
        self.rejections.fetch_add(1, Ordering::AcqRel);
    }
}

/// Jitter source that always returns the same sample in `[0, 1)`
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> Option<f64> {
        Some(self.0)
    }
}

/// Jitter source whose entropy is never available
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingJitter;

impl JitterSource for FailingJitter {
    fn sample(&self) -> Option<f64> {
        None
    }
}
