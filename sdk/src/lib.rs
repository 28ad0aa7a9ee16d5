//! E-Copyright SDK
//!
//! Shared library providing the conversation types and the error taxonomy
//! used by the engine and its web front-end.

/// Error types and handling
pub mod errors;

/// Conversation turn types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ErrorExt};
pub use types::{Role, Turn};
