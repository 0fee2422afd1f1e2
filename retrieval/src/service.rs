//! The retrieval service: text to vector, vector to similar requests.

use std::future::Future;
use std::sync::Arc;

use copilot_embeddings::{Embedding, EmbeddingError, EmbeddingProvider, EmbeddingRequest};
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::store::{SimilarityQuery, SimilarityRecord, SimilarityStore};

/// Embeds text and searches the similarity store.
///
/// Stateless apart from its collaborators; share it behind an `Arc`.
pub struct RetrievalService {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn SimilarityStore>,
    config: RetrievalConfig,
}

impl RetrievalService {
    /// Create a service over an embedding provider and a store.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn SimilarityStore>) -> Self {
        Self {
            provider,
            store,
            config: RetrievalConfig::default(),
        }
    }

    /// Use the given configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Embed `text` with one provider call.
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(RetrievalError::Validation(
                "text to vectorize must not be empty".to_string(),
            ));
        }

        let request = EmbeddingRequest::new(text);
        let response = self
            .bounded("embedding", self.provider.embed(request))
            .await??;

        if response.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()).into());
        }
        if let Some(expected) = self.config.expected_dimension
            && expected != response.embedding.len()
        {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: response.embedding.len(),
            }
            .into());
        }

        debug!(
            "Embedded {} characters into {} dimensions with {}",
            text.len(),
            response.embedding.len(),
            response.model
        );
        Ok(response.embedding)
    }

    /// Records similar to `vector`, most similar first.
    ///
    /// Only records scoring at least `min_score` are returned; `max_results`
    /// of 0 returns all of them.
    pub async fn search(
        &self,
        vector: Embedding,
        max_results: i64,
        min_score: f32,
    ) -> Result<Vec<SimilarityRecord>> {
        if let Some(expected) = self.config.expected_dimension
            && expected != vector.len()
        {
            return Err(RetrievalError::Validation(format!(
                "query has dimension {}, expected {expected}",
                vector.len()
            )));
        }
        let query = SimilarityQuery::try_new(vector, max_results, min_score)?;

        let results = self
            .bounded("similarity search", self.store.search(&query))
            .await??;

        info!(
            "Vector search returned {} results (max {}, min score {})",
            results.len(),
            query.max_results(),
            query.min_score()
        );
        Ok(results)
    }

    /// Embed `text`, then search with the resulting vector.
    pub async fn search_text(
        &self,
        text: &str,
        max_results: i64,
        min_score: f32,
    ) -> Result<Vec<SimilarityRecord>> {
        let vector = self.embed(text).await?;
        self.search(vector, max_results, min_score).await
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let limit = self.config.request_timeout();
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| RetrievalError::Timeout {
                operation,
                after_ms: limit.as_millis() as u64,
            })
    }
}
