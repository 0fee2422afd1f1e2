//! Error types for the conversational agent.

use copilot_completion::CompletionError;
use thiserror::Error;

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur while chatting with the copilot.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The caller sent something we refuse to forward to the model.
    #[error("validation error: {0}")]
    Validation(String),

    /// The completion failed.
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// A turn that cannot be appended to a transcript.
    #[error("invalid turn: {0}")]
    InvalidTurn(String),
}

impl AgentError {
    /// Whether the caller may reasonably retry the same message later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Completion(e) => e.is_retryable(),
            Self::Validation(_) | Self::InvalidTurn(_) => false,
        }
    }
}
