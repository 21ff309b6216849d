//! Client façade over the resilient transport

use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use steadfast_common::observability::ResilienceObserver;
use steadfast_common::resilience::{
    CircuitBreaker, CircuitBreakerConfig, Clock, JitterSource, RetryStrategy, RetryStrategyConfig,
    SystemClock,
};

use crate::config::ClientConfig;
use crate::errors::HttpError;
use crate::http::{
    HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, RequestContext, ResilientTransport,
};

/// HTTP client with circuit breaking and retries built in.
///
/// Cloning is cheap; clones share one breaker and one retry strategy.
pub struct Client<C: Clock = SystemClock> {
    transport: Arc<ResilientTransport<C>>,
    config: Arc<ClientConfig>,
}

impl<C: Clock> Clone for Client<C> {
    fn clone(&self) -> Self {
        Self { transport: Arc::clone(&self.transport), config: Arc::clone(&self.config) }
    }
}

impl<C: Clock> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("transport", &self.transport).finish()
    }
}

impl Client<SystemClock> {
    /// Client with default configuration over a reqwest transport.
    pub fn new() -> Result<Self, HttpError> {
        Self::builder().build()
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, HttpError> {
        Self::builder().config(config).build()
    }

    /// Start building a new client.
    pub fn builder() -> ClientBuilder<SystemClock> {
        ClientBuilder::default()
    }
}

impl<C: Clock> Client<C> {
    /// Create a request to send with [`Client::execute`].
    pub fn request(&self, method: Method, url: &str) -> Result<HttpRequest, HttpError> {
        HttpRequest::new(method, url)
    }

    /// Send `request` through the breaker and retry loop.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: HttpRequest,
    ) -> Result<HttpResponse, HttpError> {
        self.transport.send(ctx, request).await
    }

    pub async fn get(&self, ctx: &RequestContext, url: &str) -> Result<HttpResponse, HttpError> {
        self.execute(ctx, self.request(Method::GET, url)?).await
    }

    pub async fn head(&self, ctx: &RequestContext, url: &str) -> Result<HttpResponse, HttpError> {
        self.execute(ctx, self.request(Method::HEAD, url)?).await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        url: &str,
    ) -> Result<HttpResponse, HttpError> {
        self.execute(ctx, self.request(Method::DELETE, url)?).await
    }

    /// POST a buffered body; the body is replayed on retries.
    pub async fn post(
        &self,
        ctx: &RequestContext,
        url: &str,
        body: impl Into<Bytes>,
    ) -> Result<HttpResponse, HttpError> {
        let request = self.request(Method::POST, url)?.with_body(body);
        self.execute(ctx, request).await
    }

    /// PUT a buffered body; the body is replayed on retries.
    pub async fn put(
        &self,
        ctx: &RequestContext,
        url: &str,
        body: impl Into<Bytes>,
    ) -> Result<HttpResponse, HttpError> {
        let request = self.request(Method::PUT, url)?.with_body(body);
        self.execute(ctx, request).await
    }

    /// The live breaker shared by every request of this client.
    pub fn circuit_breaker(&self) -> &CircuitBreaker<C> {
        self.transport.circuit_breaker()
    }

    pub fn retry_strategy(&self) -> &RetryStrategy {
        self.transport.retry_strategy()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<ResilientTransport<C>> {
        &self.transport
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder<C: Clock = SystemClock> {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    clock: C,
    observer: Option<Arc<dyn ResilienceObserver>>,
    jitter: Option<Arc<dyn JitterSource>>,
}

impl Default for ClientBuilder<SystemClock> {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            transport: None,
            clock: SystemClock,
            observer: None,
            jitter: None,
        }
    }
}

impl<C: Clock> ClientBuilder<C> {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.config.circuit_breaker = config;
        self
    }

    pub fn retry(mut self, config: RetryStrategyConfig) -> Self {
        self.config.retry = config;
        self
    }

    pub fn server_error_threshold(mut self, threshold: u16) -> Self {
        self.config.server_error_threshold = threshold;
        self
    }

    /// Replace the default reqwest transport.
    pub fn transport(mut self, transport: impl HttpTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock<C2: Clock>(self, clock: C2) -> ClientBuilder<C2> {
        ClientBuilder {
            config: self.config,
            transport: self.transport,
            clock,
            observer: self.observer,
            jitter: self.jitter,
        }
    }

    pub fn observer(mut self, observer: Arc<dyn ResilienceObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn jitter_source(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = Some(jitter);
        self
    }

    pub fn build(self) -> Result<Client<C>, HttpError> {
        self.config.validate()?;

        let inner: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config.transport)?),
        };

        let mut builder =
            ResilientTransport::builder().shared_inner(inner).config(&self.config).clock(self.clock);
        if let Some(observer) = self.observer {
            builder = builder.observer(observer);
        }
        if let Some(jitter) = self.jitter {
            builder = builder.jitter_source(jitter);
        }

        Ok(Client { transport: Arc::new(builder.build()?), config: Arc::new(self.config) })
    }
}
