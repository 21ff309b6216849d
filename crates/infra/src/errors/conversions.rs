//! Conversions from external errors into pipeline errors.

use std::time::Duration;

use steadfast_common::error::{ErrorClassification, ErrorSeverity};

use super::{HttpError, LastFailure, TransportError, TransportErrorKind};

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

fn classify_reqwest(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::Timeout;
    }

    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return TransportErrorKind::Connect;
    }

    if err.is_body() {
        TransportErrorKind::Body
    } else if err.is_decode() {
        TransportErrorKind::Decode
    } else if err.is_request() || err.is_builder() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = classify_reqwest(&err);
        let message = match kind {
            TransportErrorKind::Timeout => "HTTP request timed out".to_string(),
            TransportErrorKind::Connect => "HTTP connection failure".to_string(),
            _ => err.to_string(),
        };
        TransportError::new(kind, message).with_source(err)
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        HttpError::Transport(err.into())
    }
}

/* -------------------------------------------------------------------------- */
/* Classification */
/* -------------------------------------------------------------------------- */

impl ErrorClassification for TransportError {
    fn is_retryable(&self) -> bool {
        !matches!(self.kind(), TransportErrorKind::Decode)
    }

    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl ErrorClassification for HttpError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::CircuitOpen { .. } => true,
            Self::Transport(err) => err.is_retryable(),
            Self::MaxRetriesExceeded { .. } => true,
            Self::RequestBodyNotRetriable
            | Self::Cancelled
            | Self::DeadlineExceeded
            | Self::InvalidRequest(_)
            | Self::Config(_) => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled | Self::DeadlineExceeded => ErrorSeverity::Info,
            Self::CircuitOpen { .. } | Self::Transport(_) => ErrorSeverity::Warning,
            Self::MaxRetriesExceeded { .. }
            | Self::RequestBodyNotRetriable
            | Self::InvalidRequest(_)
            | Self::Config(_) => ErrorSeverity::Error,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CircuitOpen { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl ErrorClassification for LastFailure {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Error(err) => err.is_retryable(),
            Self::Response(_) => true,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Error(err) => err.severity(),
            Self::Response(_) => ErrorSeverity::Warning,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::net::TcpListener;

    use reqwest::{Client, StatusCode};

    use super::*;
    use crate::http::{ContextError, HttpResponse};

    #[tokio::test]
    async fn refused_connection_maps_to_connect_kind() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let err = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped = TransportError::from(err);
        assert_eq!(mapped.kind(), TransportErrorKind::Connect);
        assert!(mapped.source().is_some());
        assert!(mapped.is_retryable());
    }

    #[test]
    fn builder_error_maps_to_request_kind() {
        let client = Client::new();
        let err = client.get("not a url").build().unwrap_err();

        let mapped: HttpError = err.into();
        match mapped {
            HttpError::Transport(inner) => assert_eq!(inner.kind(), TransportErrorKind::Request),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn context_errors_map_to_caller_variants() {
        assert!(matches!(HttpError::from(ContextError::Cancelled), HttpError::Cancelled));
        assert!(matches!(
            HttpError::from(ContextError::DeadlineExceeded),
            HttpError::DeadlineExceeded
        ));
    }

    #[test]
    fn classification_separates_caller_and_dependency_failures() {
        let open = HttpError::CircuitOpen { retry_after: Some(Duration::from_secs(3)) };
        assert!(open.is_retryable());
        assert!(open.is_dependency_failure());
        assert_eq!(open.retry_after(), Some(Duration::from_secs(3)));

        let cancelled = HttpError::Cancelled;
        assert!(!cancelled.is_retryable());
        assert!(!cancelled.is_dependency_failure());
        assert_eq!(cancelled.severity(), ErrorSeverity::Info);

        let not_retriable = HttpError::RequestBodyNotRetriable;
        assert!(!not_retriable.is_dependency_failure());
        assert_eq!(not_retriable.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn max_retries_exposes_last_response() {
        let err = HttpError::MaxRetriesExceeded {
            attempts: 3,
            last: Box::new(LastFailure::Response(HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE))),
        };

        assert_eq!(
            err.to_string(),
            "maximum retries exceeded after 3 attempts: server responded with status 503 Service Unavailable"
        );
        assert_eq!(err.last_response().map(|r| r.status().as_u16()), Some(503));
        assert!(err.source().is_some());
        assert_eq!(err.into_last_response().map(|r| r.status().as_u16()), Some(503));
    }
}
