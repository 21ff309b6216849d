//! Transport decorator adding circuit breaking and retries

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use steadfast_common::error::ConfigError;
use steadfast_common::observability::{
    AttemptOutcome, AttemptRecord, NoopObserver, ResilienceObserver,
};
use steadfast_common::resilience::{
    CircuitBreaker, CircuitBreakerConfig, Clock, JitterSource, RetryStrategy, RetryStrategyConfig,
    SystemClock,
};
use tracing::{debug, instrument, warn};

use crate::config::{validate_server_error_threshold, ClientConfig, DEFAULT_SERVER_ERROR_THRESHOLD};
use crate::errors::{HttpError, LastFailure};
use crate::http::{HttpRequest, HttpResponse, HttpTransport, RequestContext};

/// Feature switches consulted at the top of every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResiliencePolicy {
    pub circuit_breaker_enabled: bool,
    pub retry_enabled: bool,
    /// Lowest status code treated as a failed attempt
    pub server_error_threshold: u16,
}

/// Wraps an inner [`HttpTransport`] with breaker gating and retries
///
/// One breaker and one retry strategy are shared by every request sent
/// through the same transport, so breaker state reflects the aggregate
/// health of the dependency.
///
/// Per request:
/// 1. An open breaker rejects with [`HttpError::CircuitOpen`] before any
///    network call.
/// 2. Each attempt is classified: transport errors and statuses at or above
///    the threshold are failures, everything else succeeds.
/// 3. A success records `on_success` and returns the response unread.
/// 4. A failure records `on_failure`; if attempts remain the request sleeps
///    for the strategy's backoff, racing the caller's context, then retries
///    with a replayed body.
/// 5. Once attempts run out, or retries are disabled, the last failure is
///    wrapped in [`HttpError::MaxRetriesExceeded`]. With retries disabled a
///    transport error is returned as-is instead.
///
/// Errors caused by the caller (cancellation, deadline, invalid request) are
/// returned without touching the breaker.
pub struct ResilientTransport<C: Clock = SystemClock> {
    inner: Arc<dyn HttpTransport>,
    breaker: Arc<CircuitBreaker<C>>,
    strategy: Arc<RetryStrategy>,
    policy: ResiliencePolicy,
    observer: Arc<dyn ResilienceObserver>,
}

impl ResilientTransport<SystemClock> {
    pub fn builder() -> ResilientTransportBuilder<SystemClock> {
        ResilientTransportBuilder::new()
    }
}

impl<C: Clock> ResilientTransport<C> {
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker<C>> {
        &self.breaker
    }

    pub fn retry_strategy(&self) -> &Arc<RetryStrategy> {
        &self.strategy
    }

    pub fn policy(&self) -> ResiliencePolicy {
        self.policy
    }

    pub fn inner(&self) -> &Arc<dyn HttpTransport> {
        &self.inner
    }

    #[instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
    async fn execute(
        &self,
        ctx: &RequestContext,
        mut request: HttpRequest,
    ) -> Result<HttpResponse, HttpError> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }

        if self.policy.circuit_breaker_enabled && !self.breaker.is_allowed() {
            let retry_after = self.breaker.remaining_open_time();
            debug!(?retry_after, "circuit open, rejecting request");
            return Err(HttpError::CircuitOpen { retry_after });
        }

        let max_attempts =
            if self.policy.retry_enabled { self.strategy.max_attempts().max(1) } else { 1 };
        let method = request.method().to_string();
        let url = request.url().to_string();
        let mut attempt: u32 = 0;

        loop {
            if let Some(reason) = ctx.err() {
                return Err(reason.into());
            }

            let outgoing = request.for_attempt(attempt)?;
            let started = Instant::now();
            let result = self.inner.send(ctx, outgoing).await;
            let elapsed = started.elapsed();

            let failure = match result {
                Ok(response)
                    if response.status().as_u16() < self.policy.server_error_threshold =>
                {
                    let status = response.status().as_u16();
                    if self.policy.circuit_breaker_enabled {
                        self.breaker.on_success();
                    }
                    debug!(attempt, status, "attempt succeeded");
                    self.observer.record_attempt(&AttemptRecord {
                        attempt,
                        method,
                        url,
                        outcome: AttemptOutcome::Success { status },
                        backoff: None,
                        elapsed,
                    });
                    return Ok(response);
                }
                Ok(response) => LastFailure::Response(response),
                Err(err) if !err.is_dependency_failure() => {
                    debug!(attempt, error = %err, "attempt aborted by caller-side error");
                    return Err(err);
                }
                Err(err) => LastFailure::Error(err),
            };

            if self.policy.circuit_breaker_enabled {
                self.breaker.on_failure();
            }

            let has_next = attempt + 1 < max_attempts;
            let replayable = request.is_replayable();
            let backoff = (has_next && replayable).then(|| self.strategy.next_backoff(attempt));
            self.observer.record_attempt(&AttemptRecord {
                attempt,
                method: method.clone(),
                url: url.clone(),
                outcome: outcome_of(&failure),
                backoff,
                elapsed,
            });

            if has_next && !replayable {
                warn!(attempt, "request body cannot be replayed, aborting retries");
                return Err(HttpError::RequestBodyNotRetriable);
            }

            let Some(delay) = backoff else {
                let attempts = attempt + 1;
                return match failure {
                    LastFailure::Error(err) if !self.policy.retry_enabled => {
                        debug!(attempt, error = %err, "attempt failed, retries disabled");
                        Err(err)
                    }
                    last => {
                        warn!(attempts, error = %last, "retries exhausted");
                        Err(HttpError::MaxRetriesExceeded { attempts, last: Box::new(last) })
                    }
                };
            };

            debug!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %failure,
                "attempt failed, backing off"
            );
            drop(failure);

            tokio::select! {
                biased;
                reason = ctx.done() => return Err(reason.into()),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

fn outcome_of(failure: &LastFailure) -> AttemptOutcome {
    match failure {
        LastFailure::Response(response) => {
            AttemptOutcome::ServerError { status: response.status().as_u16() }
        }
        LastFailure::Error(err) => AttemptOutcome::TransportError { message: err.to_string() },
    }
}

impl<C: Clock> fmt::Debug for ResilientTransport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientTransport")
            .field("inner", &self.inner)
            .field("breaker", &self.breaker)
            .field("strategy", &self.strategy)
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl<C: Clock> HttpTransport for ResilientTransport<C> {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: HttpRequest,
    ) -> Result<HttpResponse, HttpError> {
        self.execute(ctx, request).await
    }
}

/// Builder for [`ResilientTransport`].
pub struct ResilientTransportBuilder<C: Clock = SystemClock> {
    inner: Option<Arc<dyn HttpTransport>>,
    circuit_breaker: CircuitBreakerConfig,
    retry: RetryStrategyConfig,
    server_error_threshold: u16,
    clock: C,
    observer: Arc<dyn ResilienceObserver>,
    jitter: Option<Arc<dyn JitterSource>>,
}

impl ResilientTransportBuilder<SystemClock> {
    pub fn new() -> Self {
        Self {
            inner: None,
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: RetryStrategyConfig::default(),
            server_error_threshold: DEFAULT_SERVER_ERROR_THRESHOLD,
            clock: SystemClock,
            observer: Arc::new(NoopObserver),
            jitter: None,
        }
    }
}

impl Default for ResilientTransportBuilder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ResilientTransportBuilder<C> {
    /// Set the transport that performs each attempt
    pub fn inner(mut self, transport: impl HttpTransport + 'static) -> Self {
        self.inner = Some(Arc::new(transport));
        self
    }

    pub fn shared_inner(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.inner = Some(transport);
        self
    }

    /// Take breaker, retry and threshold settings from `config`
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.circuit_breaker = config.circuit_breaker.clone();
        self.retry = config.retry.clone();
        self.server_error_threshold = config.server_error_threshold;
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    pub fn retry(mut self, config: RetryStrategyConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn server_error_threshold(mut self, threshold: u16) -> Self {
        self.server_error_threshold = threshold;
        self
    }

    /// Drive the breaker's cool-down from a different clock
    pub fn clock<C2: Clock>(self, clock: C2) -> ResilientTransportBuilder<C2> {
        ResilientTransportBuilder {
            inner: self.inner,
            circuit_breaker: self.circuit_breaker,
            retry: self.retry,
            server_error_threshold: self.server_error_threshold,
            clock,
            observer: self.observer,
            jitter: self.jitter,
        }
    }

    /// Observer told about attempts, breaker transitions and rejections
    pub fn observer(mut self, observer: Arc<dyn ResilienceObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn jitter_source(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = Some(jitter);
        self
    }

    pub fn build(self) -> Result<ResilientTransport<C>, HttpError> {
        let inner = self
            .inner
            .ok_or_else(|| ConfigError::invalid("an inner transport is required"))?;
        validate_server_error_threshold(self.server_error_threshold)?;

        let policy = ResiliencePolicy {
            circuit_breaker_enabled: self.circuit_breaker.enabled,
            retry_enabled: self.retry.enabled,
            server_error_threshold: self.server_error_threshold,
        };

        let breaker = CircuitBreaker::with_clock(self.circuit_breaker, self.clock)?
            .with_observer(Arc::clone(&self.observer));

        let mut strategy = RetryStrategy::new(&self.retry)?;
        if let Some(jitter) = self.jitter {
            strategy = strategy.with_jitter_source(jitter);
        }

        Ok(ResilientTransport {
            inner,
            breaker: Arc::new(breaker),
            strategy: Arc::new(strategy),
            policy,
            observer: self.observer,
        })
    }
}
