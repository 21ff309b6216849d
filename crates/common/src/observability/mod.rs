//! Observability hooks for resilience components
//!
//! Circuit breakers and resilient transports report what they do through the
//! [`ResilienceObserver`] trait. Observers are optional: the default
//! [`NoopObserver`] discards everything, and [`TracingObserver`] turns each
//! event into a structured `tracing` record.

pub mod traits;

// Re-export trait abstractions
pub use traits::{
    AttemptOutcome, AttemptRecord, NoopObserver, ResilienceObserver, StateTransition,
    TracingObserver,
};
