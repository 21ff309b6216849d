//! # Steadfast Infrastructure
//!
//! Resilient outbound HTTP built on the primitives in `steadfast-common`.
//!
//! This crate contains:
//! - The [`HttpTransport`] abstraction and its reqwest-backed implementation
//! - [`ResilientTransport`], a transport decorator combining a circuit breaker
//!   with exponential-backoff retries
//! - The [`Client`] façade assembling both from a [`ClientConfig`]
//! - Configuration loading from files and environment variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use steadfast_infra::{Client, RequestContext};
//!
//! # async fn run() -> Result<(), steadfast_infra::HttpError> {
//! let client = Client::new()?;
//! let ctx = RequestContext::background();
//! let response = client.get(&ctx, "https://example.com/health").await?;
//! println!("status: {}", response.status());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use config::{ClientConfig, ConfigLoadError, TransportConfig};
pub use errors::{HttpError, LastFailure, TransportError, TransportErrorKind};
pub use http::{
    BodyReplay, Client, ClientBuilder, ContextError, HttpRequest, HttpResponse, HttpTransport,
    RequestBody, RequestContext, ReqwestTransport, ResiliencePolicy, ResilientTransport,
    ResilientTransportBuilder,
};
