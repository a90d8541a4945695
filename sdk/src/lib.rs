//! Evalbot SDK
//!
//! Shared library providing the request/response types, error types and the
//! toolchain trait. This crate is used by the engine and by alternative
//! toolchain implementations.

/// Error types and handling
pub mod errors;

/// HTML entity decoding
pub mod entities;

/// Toolchain trait
pub mod toolchain;

/// Snippet request and response types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, EvalbotErrorExt};
pub use toolchain::Toolchain;
pub use types::{
    ConversationId, EvaluationOutcome, InstallOutcome, ResponseKind, ResponseMessage,
    SnippetRequest,
};
