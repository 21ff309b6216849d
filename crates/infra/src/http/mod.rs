//! Resilient outbound HTTP pipeline
//!
//! Requests flow `Client` → `ResilientTransport` → inner [`HttpTransport`]
//! (by default [`ReqwestTransport`]). The resilient layer consults a shared
//! circuit breaker, retries failed attempts with jittered exponential
//! backoff, replays request bodies and honours caller cancellation.

pub mod client;
pub mod context;
pub mod request;
pub mod resilient;
pub mod response;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use context::{ContextError, RequestContext};
pub use request::{BodyReplay, HttpRequest, RequestBody};
pub use resilient::{ResiliencePolicy, ResilientTransport, ResilientTransportBuilder};
pub use response::HttpResponse;
pub use transport::{HttpTransport, ReqwestTransport, ReqwestTransportBuilder};
