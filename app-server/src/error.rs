//! API error type and JSON error responses.
//!
//! Library errors are mapped onto HTTP status codes here and nowhere else.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use copilot_agent::AgentError;
use copilot_completion::CompletionError;
use copilot_embeddings::EmbeddingError;
use copilot_retrieval::RetrievalError;
use serde::Serialize;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. "bad_request".
    pub error: String,

    /// Human-readable error message.
    pub message: String,

    /// Whether the same request may succeed later.
    pub retryable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    /// 400 - malformed input.
    BadRequest(String),
    /// 404 - unknown resource.
    NotFound(String),
    /// 429 - upstream rate limit.
    RateLimited { message: String, retry_after_secs: u64 },
    /// 500 - unexpected failure, or the model exceeded its tool rounds.
    Internal(String),
    /// 502 - the hosted model failed or answered nonsense.
    BadGateway(String),
    /// 503 - a provider is not configured.
    ServiceUnavailable(String),
    /// 504 - an upstream call or the completion budget timed out.
    GatewayTimeout(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, retry_after_secs) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::RateLimited {
                message,
                retry_after_secs,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                message,
                Some(retry_after_secs),
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
            ApiError::BadGateway(msg) => {
                (StatusCode::BAD_GATEWAY, "provider_unavailable", msg, None)
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "timeout", msg, None),
        };

        if status.is_server_error() {
            tracing::error!("Request failed with {status}: {message}");
        }

        let body = ErrorBody {
            error: code.to_string(),
            message,
            retryable: matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS | StatusCode::GATEWAY_TIMEOUT
            ),
            retry_after_secs,
        };

        (status, Json(body)).into_response()
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        let message = err.to_string();
        match err {
            CompletionError::ProviderNotConfigured => ApiError::ServiceUnavailable(message),
            CompletionError::ProviderUnavailable(_) | CompletionError::InvalidResponse(_) => {
                ApiError::BadGateway(message)
            }
            CompletionError::RateLimited { retry_after_secs } => ApiError::RateLimited {
                message,
                retry_after_secs,
            },
            CompletionError::Timeout { .. } => ApiError::GatewayTimeout(message),
            CompletionError::LoopBoundExceeded { .. } | CompletionError::Serialization(_) => {
                ApiError::Internal(message)
            }
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Validation(msg) => ApiError::BadRequest(msg),
            AgentError::Completion(e) => e.into(),
            AgentError::InvalidTurn(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<EmbeddingError> for ApiError {
    fn from(err: EmbeddingError) -> Self {
        let message = err.to_string();
        match err {
            EmbeddingError::ProviderNotConfigured => ApiError::ServiceUnavailable(message),
            EmbeddingError::RateLimited { retry_after_secs } => ApiError::RateLimited {
                message,
                retry_after_secs,
            },
            EmbeddingError::Timeout { .. } => ApiError::GatewayTimeout(message),
            EmbeddingError::Http(ref e) if e.is_timeout() => ApiError::GatewayTimeout(message),
            _ => ApiError::BadGateway(message),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Validation(msg) => ApiError::BadRequest(msg),
            RetrievalError::Embedding(e) => e.into(),
            RetrievalError::Timeout { .. } => ApiError::GatewayTimeout(err.to_string()),
            RetrievalError::Store(_) | RetrievalError::Serialization(_) | RetrievalError::Io(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
