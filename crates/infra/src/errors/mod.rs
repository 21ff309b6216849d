//! Error types for the HTTP pipeline
//!
//! | Variant | Meaning | Breaker impact |
//! |---------|---------|----------------|
//! | `CircuitOpen` | Rejected before any network call | none |
//! | `RequestBodyNotRetriable` | Body is a read-once stream | failures already recorded |
//! | `MaxRetriesExceeded` | Retry budget spent; wraps the last failure | one failure per attempt |
//! | `Transport` | Network-level failure passed through verbatim | one failure |
//! | `Cancelled` / `DeadlineExceeded` | Caller's context fired | none if no outcome was observed |

mod conversions;

use std::fmt;
use std::time::Duration;

use steadfast_common::error::ConfigError;
use thiserror::Error;

use crate::http::{ContextError, HttpResponse};

/// Boxed error type used as the source of transport failures
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Category of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// DNS resolution or TCP/TLS connection establishment failed
    Connect,
    /// The transport's own timeout elapsed
    Timeout,
    /// The request could not be sent
    Request,
    /// Reading or writing a body failed
    Body,
    /// A response body could not be decoded
    Decode,
    /// Anything else
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Other => "transport",
        };
        f.write_str(label)
    }
}

/// A failure reported by an inner transport
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<BoxedError>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn body(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Body, message)
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The last failed attempt wrapped by [`HttpError::MaxRetriesExceeded`]
#[derive(Debug)]
pub enum LastFailure {
    /// The inner transport returned an error
    Error(HttpError),
    /// The dependency answered with a status at or above the server error
    /// threshold
    Response(HttpResponse),
}

impl fmt::Display for LastFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(err) => write!(f, "{err}"),
            Self::Response(response) => {
                write!(f, "server responded with status {}", response.status())
            }
        }
    }
}

impl std::error::Error for LastFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Error(err) => Some(err),
            Self::Response(_) => None,
        }
    }
}

/// Errors surfaced by the resilient HTTP pipeline
#[derive(Debug, Error)]
pub enum HttpError {
    /// The circuit breaker rejected the request without attempting it
    #[error("circuit breaker is open, request rejected")]
    CircuitOpen { retry_after: Option<Duration> },

    /// A retry needed the body again but it cannot be regenerated
    #[error("request body cannot be replayed for a retry; supply a body replay accessor")]
    RequestBodyNotRetriable,

    /// Every permitted attempt failed
    #[error("maximum retries exceeded after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        last: Box<LastFailure>,
    },

    /// Network-level failure from the inner transport
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// The caller's deadline passed
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The pipeline was configured with invalid values
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl HttpError {
    /// Whether this error says something about the dependency's health
    ///
    /// Caller-side problems (cancellation, malformed requests, bad
    /// configuration) must not trip the breaker.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::MaxRetriesExceeded { .. } | Self::CircuitOpen { .. }
        )
    }

    /// The failing response wrapped by `MaxRetriesExceeded`, if any
    pub fn last_response(&self) -> Option<&HttpResponse> {
        match self {
            Self::MaxRetriesExceeded { last, .. } => match last.as_ref() {
                LastFailure::Response(response) => Some(response),
                LastFailure::Error(_) => None,
            },
            _ => None,
        }
    }

    /// Consume the error, returning the failing response wrapped by
    /// `MaxRetriesExceeded`, if any
    pub fn into_last_response(self) -> Option<HttpResponse> {
        match self {
            Self::MaxRetriesExceeded { last, .. } => match *last {
                LastFailure::Response(response) => Some(response),
                LastFailure::Error(_) => None,
            },
            _ => None,
        }
    }
}

impl From<ContextError> for HttpError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl From<url::ParseError> for HttpError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(format!("invalid URL: {err}"))
    }
}
