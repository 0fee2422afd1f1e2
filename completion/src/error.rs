//! Error types for chat completion.

use thiserror::Error;

/// Result type alias for completion operations.
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Errors that can occur while producing a completion.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// Provider not configured.
    #[error("completion provider not configured")]
    ProviderNotConfigured,

    /// The hosted model could not be reached or refused the request.
    #[error("completion provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The model answered with something we cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The model kept requesting tools past the configured bound.
    #[error("model requested tools for more than {max_rounds} rounds")]
    LoopBoundExceeded { max_rounds: u32 },

    /// The call or the whole completion ran out of time.
    #[error("completion timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CompletionError {
    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout { .. })
    }
}
