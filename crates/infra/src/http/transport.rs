//! Inner transports that perform a single HTTP exchange

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client as ReqwestClient;
use tracing::debug;

use crate::config::TransportConfig;
use crate::errors::HttpError;
use crate::http::{HttpRequest, HttpResponse, RequestContext};

/// Sends one request and returns one response
///
/// Implementations perform no retries. They should abort the exchange when
/// `ctx` is cancelled or its deadline passes.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: HttpRequest,
    ) -> Result<HttpResponse, HttpError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: HttpRequest,
    ) -> Result<HttpResponse, HttpError> {
        (**self).send(ctx, request).await
    }
}

/// [`HttpTransport`] backed by `reqwest`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, HttpError> {
        Self::builder().build()
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self, HttpError> {
        let mut builder =
            Self::builder().timeout(config.timeout).connect_timeout(config.connect_timeout);
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: HttpRequest,
    ) -> Result<HttpResponse, HttpError> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let (method, url, headers, body) = request.into_parts();
        debug!(%method, %url, "sending HTTP request");

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body.into_reqwest());
        }

        tokio::select! {
            biased;
            reason = ctx.done() => Err(reason.into()),
            result = builder.send() => {
                let response = result?;
                debug!(status = %response.status(), "received HTTP response");
                Ok(HttpResponse::from_reqwest(response))
            }
        }
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: None,
            user_agent: None,
            default_headers: None,
        }
    }
}

impl ReqwestTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound the connection phase; `Duration::ZERO` leaves it unbounded.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, HttpError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        Ok(ReqwestTransport { client: builder.build()? })
    }
}
