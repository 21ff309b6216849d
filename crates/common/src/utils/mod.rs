//! Common utility functions
//!
//! - **[`serde`]**: Serialization helpers shared by configuration types

pub mod serde;

// Re-export commonly used items for convenience
pub use self::serde::duration_millis;
