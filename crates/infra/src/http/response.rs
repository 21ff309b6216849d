//! Response descriptor returned by the pipeline

use std::fmt;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::errors::{HttpError, TransportError, TransportErrorKind};

enum ResponseBody {
    Buffered(Bytes),
    Streaming(reqwest::Response),
}

/// An HTTP response whose body has not been read by the pipeline
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl HttpResponse {
    /// A response with an empty buffered body
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: ResponseBody::Buffered(Bytes::new()) }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Buffered(body.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Wrap a reqwest response, leaving its body unread
    pub fn from_reqwest(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            body: ResponseBody::Streaming(response),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Read the full body
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        match self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Streaming(response) => Ok(response.bytes().await?),
        }
    }

    /// Read the body as UTF-8 text
    pub async fn text(self) -> Result<String, HttpError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|err| {
            TransportError::new(TransportErrorKind::Decode, "response body is not valid UTF-8")
                .with_source(err)
                .into()
        })
    }

    /// Deserialize the body as JSON
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            TransportError::new(TransportErrorKind::Decode, "failed to decode JSON body")
                .with_source(err)
                .into()
        })
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            ResponseBody::Buffered(bytes) => format!("buffered({} bytes)", bytes.len()),
            ResponseBody::Streaming(_) => "streaming".to_string(),
        };
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}
