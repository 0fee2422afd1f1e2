//! Error types for the retrieval service.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval service.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Malformed input, rejected before any network or store call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Embedding error.
    #[error("error generating embeddings: {0}")]
    Embedding(#[from] copilot_embeddings::EmbeddingError),

    /// The similarity store failed or could not be loaded.
    #[error("store error: {0}")]
    Store(String),

    /// A call did not complete within the configured timeout.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Embedding(e) => e.is_retryable(),
            _ => false,
        }
    }
}
