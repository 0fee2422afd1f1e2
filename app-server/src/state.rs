//! Application state shared across all route handlers.

use std::sync::Arc;

use anyhow::Context;
use copilot_agent::CopilotSessions;
use copilot_completion::{ChatEndpoint, CompletionProvider, OpenAiChatModel};
use copilot_embeddings::{AzureDeployment, OpenAIProvider};
use copilot_retrieval::{InMemorySimilarityStore, RetrievalService};
use copilot_tools::{
    FileRequestStore, ToolExecutor, ToolRegistry, log_tool_surface, register_maintenance_tools,
};
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// One copilot per conversation.
    pub sessions: Arc<CopilotSessions>,

    /// Stateless completions for `/Chat`.
    pub completion: Arc<CompletionProvider>,

    /// Embedding and vector search.
    pub retrieval: Arc<RetrievalService>,
}

impl AppState {
    /// Assemble state from already-built services.
    pub fn new(
        sessions: Arc<CopilotSessions>,
        completion: Arc<CompletionProvider>,
        retrieval: Arc<RetrievalService>,
    ) -> Self {
        Self {
            sessions,
            completion,
            retrieval,
        }
    }

    /// Build every service from configuration.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let openai = &config.openai;
        let completion_config = config.completion.to_config();

        let request_store = FileRequestStore::new(&config.storage.requests_dir)
            .await
            .context("failed to open the maintenance request store")?;
        let mut registry = ToolRegistry::new().with_executor(
            ToolExecutor::new().with_default_timeout(completion_config.tool_timeout),
        );
        register_maintenance_tools(&mut registry, Arc::new(request_store))?;
        log_tool_surface(&registry);

        let endpoint = match &openai.endpoint {
            Some(endpoint) => ChatEndpoint::Azure {
                endpoint: endpoint.clone(),
                deployment: openai.chat_model.clone(),
                api_version: openai.api_version.clone(),
            },
            None => ChatEndpoint::OpenAi {
                base_url: openai.base_url.clone(),
                model: openai.chat_model.clone(),
            },
        };
        let mut model =
            OpenAiChatModel::new(endpoint).with_timeout(completion_config.request_timeout);
        if let Some(key) = &openai.api_key {
            model = model.with_api_key(key);
        }
        if !model.is_available() {
            warn!("No OpenAI API key configured; model calls will fail");
        }
        let completion = Arc::new(
            CompletionProvider::new(Arc::new(model), Arc::new(registry))
                .with_config(completion_config),
        );

        let sessions = Arc::new(
            CopilotSessions::new(completion.clone()).with_config(config.sessions.to_config()),
        );

        let retrieval = Arc::new(build_retrieval(config).await?);

        info!("Copilot services ready");
        Ok(Self::new(sessions, completion, retrieval))
    }
}

async fn build_retrieval(config: &ServerConfig) -> anyhow::Result<RetrievalService> {
    let openai = &config.openai;
    let retrieval = &config.retrieval;
    let mut embedder = OpenAIProvider::new()
        .with_model(&openai.embedding_model)
        .with_timeout(retrieval.request_timeout());
    if let Some(key) = &openai.api_key {
        embedder = embedder.with_api_key(key);
    }
    embedder = match &openai.endpoint {
        Some(endpoint) => embedder
            .with_base_url(endpoint)
            .with_azure_deployment(AzureDeployment {
                deployment: openai.embedding_model.clone(),
                api_version: openai.api_version.clone(),
            }),
        None => embedder.with_base_url(&openai.base_url),
    };

    let store = match &config.storage.documents_path {
        Some(path) => InMemorySimilarityStore::load(path)
            .await
            .with_context(|| format!("failed to load documents from {}", path.display()))?,
        None => {
            warn!("No documents file configured; vector search runs over an empty store");
            InMemorySimilarityStore::new()
        }
    };

    Ok(RetrievalService::new(Arc::new(embedder), Arc::new(store)).with_config(retrieval.clone()))
}
