//! Outbound request descriptor with body replay support

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::errors::HttpError;

/// Produces a fresh copy of a request body for a retry attempt
pub type BodyReplay = Arc<dyn Fn() -> RequestBody + Send + Sync>;

/// Body of an outbound request
#[derive(Debug)]
pub enum RequestBody {
    /// Fully buffered body, cheap to clone
    Bytes(Bytes),
    /// Read-once body; retries need an explicit [`BodyReplay`]
    Stream(reqwest::Body),
}

impl RequestBody {
    /// Whether the body is known to be empty
    ///
    /// Streaming bodies are never treated as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Stream(_) => false,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Stream(_) => None,
        }
    }

    pub(crate) fn into_reqwest(self) -> reqwest::Body {
        match self {
            Self::Bytes(bytes) => reqwest::Body::from(bytes),
            Self::Stream(body) => body,
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<reqwest::Body> for RequestBody {
    fn from(body: reqwest::Body) -> Self {
        Self::Stream(body)
    }
}

/// An outbound HTTP request
///
/// Buffered bodies set through [`HttpRequest::with_body`] can be replayed
/// automatically. Streaming bodies need [`HttpRequest::with_body_replay`]
/// before the pipeline is allowed to retry them.
pub struct HttpRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<RequestBody>,
    replay: Option<BodyReplay>,
    has_body: bool,
}

impl HttpRequest {
    /// Parse `url` and create a request without a body
    pub fn new(method: Method, url: &str) -> Result<Self, HttpError> {
        let url = Url::parse(url)?;
        Ok(Self::from_url(method, url))
    }

    pub fn from_url(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: None, replay: None, has_body: false }
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Attach a buffered body that is replayed on every retry
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let bytes: Bytes = body.into();
        let replay_bytes = bytes.clone();
        self.has_body = !bytes.is_empty();
        self.body = Some(RequestBody::Bytes(bytes));
        self.replay = Some(Arc::new(move || RequestBody::Bytes(replay_bytes.clone())));
        self
    }

    /// Attach a read-once body
    ///
    /// Any previously installed replay accessor is cleared.
    #[must_use]
    pub fn with_streaming_body(mut self, body: impl Into<reqwest::Body>) -> Self {
        let body = RequestBody::Stream(body.into());
        self.has_body = !body.is_empty();
        self.body = Some(body);
        self.replay = None;
        self
    }

    /// Install the accessor used to regenerate the body for retries
    #[must_use]
    pub fn with_body_replay<F>(mut self, replay: F) -> Self
    where
        F: Fn() -> RequestBody + Send + Sync + 'static,
    {
        self.replay = Some(Arc::new(replay));
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type`
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, HttpError> {
        let payload = serde_json::to_vec(value)
            .map_err(|err| HttpError::InvalidRequest(format!("failed to encode JSON body: {err}")))?;
        Ok(self
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(payload))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Whether the request can be sent more than once
    pub fn is_replayable(&self) -> bool {
        !self.has_body || self.replay.is_some()
    }

    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<RequestBody>) {
        (self.method, self.url, self.headers, self.body)
    }

    /// Build the request to send for the zero-based `attempt`
    ///
    /// The first attempt moves the original body out. Later attempts
    /// regenerate it through the replay accessor.
    pub(crate) fn for_attempt(&mut self, attempt: u32) -> Result<HttpRequest, HttpError> {
        let body = if attempt == 0 {
            self.body.take()
        } else if !self.has_body {
            None
        } else {
            match &self.replay {
                Some(replay) => Some(replay()),
                None => return Err(HttpError::RequestBodyNotRetriable),
            }
        };

        Ok(HttpRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            has_body: body.as_ref().is_some_and(|body| !body.is_empty()),
            body,
            replay: None,
        })
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("replayable", &self.is_replayable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates buffered body replay across attempts.
    ///
    /// Assertions:
    /// - Confirms every attempt carries the same payload.
    /// - Ensures headers and URL are copied into each attempt.
    #[test]
    fn buffered_body_is_replayed() {
        let mut request = HttpRequest::new(Method::POST, "https://example.com/items")
            .unwrap()
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_body("payload");
        assert!(request.is_replayable());

        for attempt in 0..3 {
            let sent = request.for_attempt(attempt).unwrap();
            assert_eq!(sent.body().and_then(RequestBody::as_bytes), Some(&b"payload"[..]));
            assert_eq!(sent.url().as_str(), "https://example.com/items");
            assert_eq!(sent.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        }
    }

    /// Validates that read-once bodies refuse a second attempt.
    ///
    /// Assertions:
    /// - Confirms the first attempt succeeds.
    /// - Ensures the second attempt fails with `RequestBodyNotRetriable`.
    #[test]
    fn streaming_body_without_replay_is_not_retriable() {
        let mut request = HttpRequest::new(Method::PUT, "https://example.com/upload")
            .unwrap()
            .with_streaming_body(reqwest::Body::from("chunk"));
        assert!(!request.is_replayable());

        assert!(request.for_attempt(0).is_ok());
        assert!(matches!(request.for_attempt(1), Err(HttpError::RequestBodyNotRetriable)));
    }

    #[test]
    fn streaming_body_with_replay_is_retriable() {
        let mut request = HttpRequest::new(Method::PUT, "https://example.com/upload")
            .unwrap()
            .with_streaming_body(reqwest::Body::from("chunk"))
            .with_body_replay(|| RequestBody::from("chunk"));
        assert!(request.is_replayable());

        request.for_attempt(0).unwrap();
        let retry = request.for_attempt(1).unwrap();
        assert_eq!(retry.body().and_then(RequestBody::as_bytes), Some(&b"chunk"[..]));
    }

    #[test]
    fn bodyless_and_empty_requests_are_replayable() {
        let mut request = HttpRequest::new(Method::GET, "https://example.com").unwrap();
        request.for_attempt(0).unwrap();
        assert!(request.for_attempt(1).unwrap().body().is_none());

        let empty = HttpRequest::new(Method::POST, "https://example.com").unwrap().with_body("");
        assert!(empty.is_replayable());
    }

    #[test]
    fn json_body_sets_content_type() {
        let request = HttpRequest::new(Method::POST, "https://example.com")
            .unwrap()
            .with_json(&serde_json::json!({ "id": 7 }))
            .unwrap();

        assert_eq!(request.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.body().and_then(RequestBody::as_bytes), Some(&br#"{"id":7}"#[..]));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = HttpRequest::new(Method::GET, "not a url").unwrap_err();
        assert!(matches!(err, HttpError::InvalidRequest(_)));
    }
}
