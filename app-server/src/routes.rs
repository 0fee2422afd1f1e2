//! Router setup and endpoint handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Form, Json, Router};
use copilot_completion::ConversationTurn;
use copilot_retrieval::SimilarityRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Create the router with every endpoint.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/Chat", post(chat))
        .route("/Vectorize", get(vectorize))
        .route("/VectorSearch", post(vector_search))
        .route("/MaintenanceCopilotChat", post(copilot_chat))
        .route(
            "/MaintenanceCopilotChat/{session_id}",
            delete(end_copilot_session),
        )
        .with_state(state)
}

async fn index() -> &'static str {
    "Welcome to the maintenance copilot API!"
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub message: String,
}

/// Single-shot completion with tools: no persona, no history.
async fn chat(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Result<String, ApiError> {
    if form.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let tools = state.completion.tools().descriptors();
    let completion = state
        .completion
        .complete(&[ConversationTurn::user(form.message)], &tools)
        .await?;
    Ok(completion.reply.content)
}

#[derive(Debug, Deserialize)]
pub struct VectorizeParams {
    pub text: String,
}

async fn vectorize(
    State(state): State<AppState>,
    Query(params): Query<VectorizeParams>,
) -> Result<Json<Vec<f32>>, ApiError> {
    Ok(Json(state.retrieval.embed(&params.text).await?))
}

#[derive(Debug, Deserialize)]
pub struct VectorSearchParams {
    pub max_results: Option<i64>,
    pub minimum_similarity_score: Option<f32>,
}

async fn vector_search(
    State(state): State<AppState>,
    Query(params): Query<VectorSearchParams>,
    Json(vector): Json<Vec<f32>>,
) -> Result<Json<Vec<SimilarityRecord>>, ApiError> {
    let defaults = state.retrieval.config();
    let max_results = params
        .max_results
        .unwrap_or(defaults.default_max_results as i64);
    let min_score = params
        .minimum_similarity_score
        .unwrap_or(defaults.default_min_score);

    debug!("Vector search with max_results={max_results}, min_score={min_score}");
    let results = state
        .retrieval
        .search(vector, max_results, min_score)
        .await?;
    Ok(Json(results))
}

/// Body of a copilot chat. A bare JSON string starts a new session.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CopilotChatRequest {
    Message(String),
    Session {
        #[serde(default)]
        session_id: Option<String>,
        message: String,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CopilotChatResponse {
    pub session_id: String,
    pub reply: String,
}

async fn copilot_chat(
    State(state): State<AppState>,
    Json(request): Json<CopilotChatRequest>,
) -> Result<Json<CopilotChatResponse>, ApiError> {
    let (session_id, message) = match request {
        CopilotChatRequest::Message(message) => (None, message),
        CopilotChatRequest::Session {
            session_id,
            message,
        } => (session_id, message),
    };

    let reply = state
        .sessions
        .chat(session_id.as_deref(), &message)
        .await?;
    Ok(Json(CopilotChatResponse {
        session_id: reply.session_id,
        reply: reply.reply,
    }))
}

async fn end_copilot_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no session {session_id}")))
    }
}
