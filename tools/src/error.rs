//! Error types for the tool surface.

use thiserror::Error;

/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors that can occur while registering or invoking tools.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Tool not found.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool already exists.
    #[error("tool already exists: {0}")]
    AlreadyExists(String),

    /// Invalid tool definition.
    #[error("invalid tool definition: {0}")]
    InvalidDefinition(String),

    /// Invalid tool input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Tool did not finish within its time budget.
    #[error("tool {name} timed out after {after_ms}ms")]
    TimedOut { name: String, after_ms: u64 },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read a request file.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write a request file.
    #[error("failed to write file: {0}")]
    WriteFile(String),
}
