//! Circuit breaker for a single downstream dependency
//!
//! The breaker moves through three states:
//!
//! ```text
//!            failures >= threshold
//!   Closed ─────────────────────────▶ Open
//!     ▲                               │  ▲
//!     │ successes >= needed           │  │ any failure
//!     │                 reset_timeout │  │
//!     │                      elapsed  ▼  │
//!     └────────────────────────── HalfOpen
//! ```
//!
//! No other transitions are possible. The Open→HalfOpen move happens inside
//! [`CircuitBreaker::is_allowed`] under the same write lock that performs the
//! elapsed-time check, so concurrent callers cannot each believe they
//! admitted the probe.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::observability::{NoopObserver, ResilienceObserver, StateTransition};
use crate::utils::serde::duration_millis;

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// Circuit breakers use real monotonic time in production and controlled mock
/// time in tests, so reset-timeout behavior can be tested without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed time, so a test can hand one clone to a
/// breaker and advance the other.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Advance the mock clock by milliseconds (convenience method)
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }
}

//==============================================================================
// State and Configuration
//==============================================================================

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, admitting probe requests to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Whether requests are gated by the breaker at all
    pub enabled: bool,
    /// Number of failures while closed before opening the circuit
    pub failure_threshold: u32,
    /// Time an open circuit waits after the last failure before probing
    #[serde(with = "duration_millis")]
    pub reset_timeout: Duration,
    /// Number of probe successes needed to close the circuit from half-open
    pub half_open_success_needed: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            half_open_success_needed: 2,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be greater than 0"));
        }

        if self.half_open_success_needed == 0 {
            return Err(ConfigError::invalid("half_open_success_needed must be greater than 0"));
        }

        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`]
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    pub fn half_open_success_needed(mut self, successes: u32) -> Self {
        self.config.half_open_success_needed = successes;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Circuit breaker metrics snapshot for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub failure_count: u32,
    pub half_open_success_count: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    pub rejected_calls: u64,
    pub last_failure_time: Option<Instant>,
}

//==============================================================================
// Circuit Breaker
//==============================================================================

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    half_open_success_count: u32,
    last_failure_time: Option<Instant>,
    total_successes: u64,
    total_failures: u64,
    rejected_calls: u64,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            half_open_success_count: 0,
            last_failure_time: None,
            total_successes: 0,
            total_failures: 0,
            rejected_calls: 0,
        }
    }

    fn transition(&mut self, to: CircuitState) -> StateTransition {
        let from = self.state;
        self.state = to;
        self.half_open_success_count = 0;
        if to == CircuitState::Closed {
            self.failure_count = 0;
        }
        StateTransition { from, to }
    }
}

/// Circuit breaker guarding one downstream dependency
///
/// All fields live behind one [`RwLock`]: mutations ([`on_success`],
/// [`on_failure`] and the probe transition inside [`is_allowed`]) take the
/// write lock, snapshots ([`state`], [`metrics`]) take the read lock.
/// [`is_allowed`] only takes the write lock while the circuit is open.
/// Observers are notified after the lock is released.
///
/// [`on_success`]: CircuitBreaker::on_success
/// [`on_failure`]: CircuitBreaker::on_failure
/// [`is_allowed`]: CircuitBreaker::is_allowed
/// [`state`]: CircuitBreaker::state
/// [`metrics`]: CircuitBreaker::metrics
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    inner: RwLock<BreakerState>,
    clock: C,
    observer: Arc<dyn ResilienceObserver>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .field("half_open_success_count", &inner.half_open_success_count)
            .finish()
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker with the given configuration using the
    /// system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for CircuitBreaker<SystemClock> {
    fn default() -> Self {
        Self {
            config: CircuitBreakerConfig::default(),
            inner: RwLock::new(BreakerState::closed()),
            clock: SystemClock,
            observer: Arc::new(NoopObserver),
        }
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            inner: RwLock::new(BreakerState::closed()),
            clock,
            observer: Arc::new(NoopObserver),
        })
    }

    /// Attach an observer that is told about every state transition and
    /// rejected call
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ResilienceObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Decide whether a new call may be attempted
    ///
    /// Closed and half-open circuits admit calls. An open circuit rejects
    /// calls until more than `reset_timeout` has passed since the last
    /// failure; the first caller to observe that moves the circuit to
    /// half-open and is admitted as the probe.
    pub fn is_allowed(&self) -> bool {
        if self.inner.read().state != CircuitState::Open {
            return true;
        }

        // Re-check under the write lock: another caller may have admitted
        // the probe between the two acquisitions.
        let transition = {
            let mut inner = self.inner.write();
            let state = inner.state;
            match state {
                CircuitState::Closed | CircuitState::HalfOpen => return true,
                CircuitState::Open => {
                    let now = self.clock.now();
                    let cooled_down = inner.last_failure_time.map_or(true, |failed_at| {
                        now.saturating_duration_since(failed_at) > self.config.reset_timeout
                    });
                    if !cooled_down {
                        inner.rejected_calls = inner.rejected_calls.saturating_add(1);
                        drop(inner);
                        debug!("Circuit breaker rejecting call - state: {}", CircuitState::Open);
                        self.observer.record_rejection(CircuitState::Open);
                        return false;
                    }
                    inner.transition(CircuitState::HalfOpen)
                }
            }
        };

        info!("Circuit breaker half-open, admitting probe request");
        self.observer.record_state_transition(&transition);
        true
    }

    /// Record a successful call
    ///
    /// A success while closed clears the failure count. While half-open it
    /// counts towards `half_open_success_needed`; reaching it closes the
    /// circuit. Successes reported while open (calls admitted before the
    /// circuit tripped) change nothing.
    pub fn on_success(&self) {
        let transition = {
            let mut inner = self.inner.write();
            inner.total_successes = inner.total_successes.saturating_add(1);

            let state = inner.state;
            match state {
                CircuitState::Closed => {
                    inner.failure_count = 0;
                    None
                }
                CircuitState::HalfOpen => {
                    inner.half_open_success_count += 1;
                    if inner.half_open_success_count >= self.config.half_open_success_needed {
                        Some(inner.transition(CircuitState::Closed))
                    } else {
                        None
                    }
                }
                CircuitState::Open => None,
            }
        };

        if let Some(transition) = transition {
            info!(
                successes = self.config.half_open_success_needed,
                "Circuit breaker closed after successful probes"
            );
            self.observer.record_state_transition(&transition);
        }
    }

    /// Record a failed call
    ///
    /// Every failure bumps the failure count and the last-failure timestamp.
    /// A half-open circuit reopens immediately; a closed circuit opens once
    /// the count reaches `failure_threshold`.
    pub fn on_failure(&self) {
        let (transition, failure_count) = {
            let mut inner = self.inner.write();
            inner.failure_count = inner.failure_count.saturating_add(1);
            inner.total_failures = inner.total_failures.saturating_add(1);
            inner.last_failure_time = Some(self.clock.now());

            let state = inner.state;
            let tripped = inner.failure_count >= self.config.failure_threshold;
            let transition = match state {
                CircuitState::Closed if tripped => {
                    Some(inner.transition(CircuitState::Open))
                }
                CircuitState::HalfOpen => Some(inner.transition(CircuitState::Open)),
                CircuitState::Closed | CircuitState::Open => None,
            };
            (transition, inner.failure_count)
        };

        if let Some(transition) = transition {
            if transition.from == CircuitState::HalfOpen {
                warn!("Circuit breaker reopened due to failure in half-open state");
            } else {
                warn!(failure_count, "Circuit breaker opened after repeated failures");
            }
            self.observer.record_state_transition(&transition);
        }
    }

    /// Get the current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.inner.read().state
    }

    /// Get a metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.read();
        CircuitBreakerMetrics {
            state: inner.state,
            failure_count: inner.failure_count,
            half_open_success_count: inner.half_open_success_count,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            rejected_calls: inner.rejected_calls,
            last_failure_time: inner.last_failure_time,
        }
    }

    /// Time left before an open circuit admits a probe
    ///
    /// Returns `None` unless the circuit is open.
    pub fn remaining_open_time(&self) -> Option<Duration> {
        let inner = self.inner.read();
        if inner.state != CircuitState::Open {
            return None;
        }
        let elapsed = inner
            .last_failure_time
            .map_or(self.config.reset_timeout, |t| self.clock.now().saturating_duration_since(t));
        Some(self.config.reset_timeout.saturating_sub(elapsed))
    }

    /// Configuration the breaker was built with
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Reset the circuit breaker to closed state, clearing all counters
    pub fn reset(&self) {
        let transition = {
            let mut inner = self.inner.write();
            let from = inner.state;
            *inner = BreakerState::closed();
            (from != CircuitState::Closed)
                .then_some(StateTransition { from, to: CircuitState::Closed })
        };

        info!("Circuit breaker manually reset to closed state");
        if let Some(transition) = transition {
            self.observer.record_state_transition(&transition);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the circuit breaker
    //!
    //! Tests cover configuration validation, every legal state transition,
    //! timeout behavior with a mock clock, and concurrent access.

    use std::thread;

    use super::*;
    use crate::testing::RecordingObserver;

    fn breaker_with(
        failure_threshold: u32,
        reset_timeout: Duration,
        half_open_success_needed: u32,
    ) -> (CircuitBreaker<MockClock>, MockClock) {
        let config = CircuitBreakerConfig::builder()
            .failure_threshold(failure_threshold)
            .reset_timeout(reset_timeout)
            .half_open_success_needed(half_open_success_needed)
            .build()
            .expect("valid config");
        let clock = MockClock::new();
        let breaker = CircuitBreaker::with_clock(config, clock.clone()).expect("valid breaker");
        (breaker, clock)
    }

    // =========================================================================
    // Clock Tests
    // =========================================================================

    /// Validates `MockClock::advance` behavior shared across clones.
    ///
    /// Assertions:
    /// - Confirms `after.duration_since(start)` equals 5s.
    /// - Confirms the clone observes the same elapsed time.
    #[test]
    fn test_mock_clock_advance_is_shared() {
        let clock = MockClock::new();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::from_secs(5));

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
        assert_eq!(clock.elapsed(), other.elapsed());
    }

    // =========================================================================
    // Config Tests
    // =========================================================================

    /// Validates `CircuitState` display labels.
    ///
    /// Assertions:
    /// - Confirms `CLOSED`, `OPEN` and `HALF_OPEN`.
    #[test]
    fn test_circuit_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }

    /// Validates `CircuitBreakerConfig::default` values.
    ///
    /// Assertions:
    /// - Ensures the breaker is enabled.
    /// - Confirms threshold 5, reset timeout 60s, 2 half-open successes.
    #[test]
    fn test_circuit_breaker_config_default() {
        let config = CircuitBreakerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.reset_timeout, Duration::from_secs(60));
        assert_eq!(config.half_open_success_needed, 2);
        assert!(config.validate().is_ok());
    }

    /// Validates that zero thresholds are rejected by the builder.
    ///
    /// Assertions:
    /// - Ensures a zero `failure_threshold` fails validation.
    /// - Ensures a zero `half_open_success_needed` fails validation.
    #[test]
    fn test_circuit_breaker_config_validation() {
        let err = CircuitBreakerConfig::builder().failure_threshold(0).build().unwrap_err();
        assert!(err.to_string().contains("failure_threshold"));

        let err = CircuitBreakerConfig::builder().half_open_success_needed(0).build().unwrap_err();
        assert!(err.to_string().contains("half_open_success_needed"));
    }

    /// Validates config deserialization with partial input.
    ///
    /// Assertions:
    /// - Confirms provided fields are read (reset timeout in milliseconds).
    /// - Confirms missing fields fall back to defaults.
    #[test]
    fn test_circuit_breaker_config_deserialize_partial() {
        let config: CircuitBreakerConfig =
            serde_json::from_str(r#"{"failure_threshold":3,"reset_timeout":1500}"#)
                .expect("valid json");

        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.reset_timeout, Duration::from_millis(1500));
        assert!(config.enabled);
        assert_eq!(config.half_open_success_needed, 2);
    }

    // =========================================================================
    // State Transition Tests
    // =========================================================================

    /// Validates the Closed→Open transition at the failure threshold.
    ///
    /// Assertions:
    /// - Confirms the breaker stays closed after two failures.
    /// - Confirms the third failure opens it and `is_allowed()` is false.
    #[test]
    fn test_opens_after_threshold_failures() {
        let (breaker, _clock) = breaker_with(3, Duration::from_secs(10), 1);

        breaker.on_failure();
        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.is_allowed());

        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.is_allowed());
        assert_eq!(breaker.metrics().rejected_calls, 1);
    }

    /// Validates that a success while closed clears the failure count.
    ///
    /// Assertions:
    /// - Confirms `failure_count` returns to 0.
    /// - Confirms two more failures do not open a threshold-3 breaker.
    #[test]
    fn test_success_while_closed_resets_failures() {
        let (breaker, _clock) = breaker_with(3, Duration::from_secs(10), 1);

        breaker.on_failure();
        breaker.on_failure();
        breaker.on_success();
        assert_eq!(breaker.metrics().failure_count, 0);

        breaker.on_failure();
        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    /// Validates the Open→HalfOpen probe admission after the reset timeout.
    ///
    /// Assertions:
    /// - Ensures calls are rejected at exactly `reset_timeout`.
    /// - Ensures the first call past the timeout is admitted and the state
    ///   becomes HalfOpen.
    /// - Confirms the transition is reported exactly once.
    #[test]
    fn test_probe_admitted_after_reset_timeout() {
        let observer = Arc::new(RecordingObserver::new());
        let (breaker, clock) = breaker_with(1, Duration::from_millis(100), 1);
        let breaker = breaker.with_observer(observer.clone());

        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance_millis(100);
        assert!(!breaker.is_allowed());
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance_millis(1);
        assert!(breaker.is_allowed());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.is_allowed());

        let half_open_entries = observer
            .transitions()
            .iter()
            .filter(|t| t.from == CircuitState::Open && t.to == CircuitState::HalfOpen)
            .count();
        assert_eq!(half_open_entries, 1);
    }

    /// Validates the HalfOpen→Closed transition after enough successes.
    ///
    /// Assertions:
    /// - Confirms one success is not enough when two are needed.
    /// - Confirms the second success closes the breaker with a zero
    ///   failure count.
    #[test]
    fn test_half_open_closes_after_needed_successes() {
        let (breaker, clock) = breaker_with(2, Duration::from_millis(50), 2);

        breaker.on_failure();
        breaker.on_failure();
        clock.advance_millis(51);
        assert!(breaker.is_allowed());

        breaker.on_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.metrics().half_open_success_count, 1);

        breaker.on_success();
        let metrics = breaker.metrics();
        assert_eq!(metrics.state, CircuitState::Closed);
        assert_eq!(metrics.failure_count, 0);
        assert_eq!(metrics.half_open_success_count, 0);
    }

    /// Validates the HalfOpen→Open transition on a single failure.
    ///
    /// Assertions:
    /// - Confirms a failing probe reopens the breaker even with a large
    ///   failure threshold.
    /// - Ensures the reopened breaker waits a full reset timeout again.
    #[test]
    fn test_half_open_failure_reopens() {
        let (breaker, clock) = breaker_with(1, Duration::from_millis(50), 3);

        breaker.on_failure();
        clock.advance_millis(51);
        assert!(breaker.is_allowed());
        breaker.on_success();

        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance_millis(10);
        assert!(!breaker.is_allowed());
        assert!(breaker.remaining_open_time().is_some());
    }

    /// Validates that successes reported while open do not close the circuit.
    ///
    /// Assertions:
    /// - Confirms the state stays Open.
    #[test]
    fn test_success_while_open_is_ignored() {
        let (breaker, _clock) = breaker_with(1, Duration::from_secs(10), 1);

        breaker.on_failure();
        breaker.on_success();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.metrics().total_successes, 1);
    }

    /// Validates `remaining_open_time` while open and closed.
    ///
    /// Assertions:
    /// - Confirms `None` while closed.
    /// - Confirms the remaining time shrinks as the clock advances.
    #[test]
    fn test_remaining_open_time() {
        let (breaker, clock) = breaker_with(1, Duration::from_secs(10), 1);
        assert_eq!(breaker.remaining_open_time(), None);

        breaker.on_failure();
        clock.advance(Duration::from_secs(4));
        assert_eq!(breaker.remaining_open_time(), Some(Duration::from_secs(6)));
    }

    /// Validates `reset` from the open state.
    ///
    /// Assertions:
    /// - Confirms the state returns to Closed with cleared counters.
    /// - Confirms the Open→Closed transition is reported.
    #[test]
    fn test_manual_reset() {
        let observer = Arc::new(RecordingObserver::new());
        let (breaker, _clock) = breaker_with(1, Duration::from_secs(10), 1);
        let breaker = breaker.with_observer(observer.clone());

        breaker.on_failure();
        breaker.reset();

        let metrics = breaker.metrics();
        assert_eq!(metrics.state, CircuitState::Closed);
        assert_eq!(metrics.failure_count, 0);
        assert_eq!(metrics.total_failures, 0);
        assert_eq!(metrics.last_failure_time, None);
        assert_eq!(
            observer.transitions().last(),
            Some(&StateTransition { from: CircuitState::Open, to: CircuitState::Closed })
        );
    }

    // =========================================================================
    // Concurrency Tests
    // =========================================================================

    /// Validates that concurrent failures are all counted.
    ///
    /// Assertions:
    /// - Confirms `total_failures` equals the number of recorded failures.
    #[test]
    fn test_concurrent_failures_are_not_lost() {
        let (breaker, _clock) = breaker_with(10_000, Duration::from_secs(10), 1);
        let breaker = Arc::new(breaker);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let breaker = Arc::clone(&breaker);
                thread::spawn(move || {
                    for _ in 0..250 {
                        breaker.on_failure();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        let metrics = breaker.metrics();
        assert_eq!(metrics.failure_count, 2_000);
        assert_eq!(metrics.total_failures, 2_000);
        assert_eq!(metrics.state, CircuitState::Closed);
    }

    /// Validates that admitting calls does not need exclusive access.
    ///
    /// Assertions:
    /// - Confirms closed and half-open breakers admit calls while another
    ///   reader holds the state lock.
    #[test]
    fn test_admission_shares_the_state_lock() {
        let (breaker, clock) = breaker_with(1, Duration::from_millis(10), 2);

        {
            let _snapshot = breaker.inner.read();
            assert!(breaker.is_allowed());
        }

        breaker.on_failure();
        clock.advance_millis(11);
        assert!(breaker.is_allowed());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let _snapshot = breaker.inner.read();
        assert!(breaker.is_allowed());
    }

    /// Validates that concurrent probes produce a single HalfOpen transition.
    ///
    /// Assertions:
    /// - Ensures every caller is admitted once the timeout has elapsed.
    /// - Confirms exactly one Open→HalfOpen transition is reported.
    #[test]
    fn test_concurrent_probe_transition_happens_once() {
        let observer = Arc::new(RecordingObserver::new());
        let (breaker, clock) = breaker_with(1, Duration::from_millis(10), 5);
        let breaker = Arc::new(breaker.with_observer(observer.clone()));

        breaker.on_failure();
        clock.advance_millis(20);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let breaker = Arc::clone(&breaker);
                thread::spawn(move || breaker.is_allowed())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().expect("thread panicked"));
        }

        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        let probes = observer.transitions().iter().filter(|t| t.to == CircuitState::HalfOpen).count();
        assert_eq!(probes, 1);
    }
}
