//! Similarity store over pre-embedded maintenance requests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use copilot_embeddings::{Embedding, rank_by_similarity};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RetrievalError};

/// A maintenance request with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceDocument {
    /// Unique identifier.
    pub id: String,

    /// Hotel the request was raised for.
    pub hotel_id: i64,

    /// Hotel name.
    pub hotel: String,

    /// Request text.
    pub details: String,

    /// Who raised the request.
    pub source: String,

    /// Embedding of `details`.
    pub request_vector: Embedding,
}

/// A validated similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityQuery {
    vector: Embedding,
    max_results: usize,
    min_score: f32,
}

impl SimilarityQuery {
    /// Build a query, rejecting empty or non-finite vectors, a negative
    /// `max_results` and a non-finite `min_score`. A `max_results` of 0 means
    /// every qualifying record.
    pub fn try_new(vector: Embedding, max_results: i64, min_score: f32) -> Result<Self> {
        if vector.is_empty() {
            return Err(RetrievalError::Validation(
                "query vector must not be empty".to_string(),
            ));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(RetrievalError::Validation(
                "query vector must contain only finite values".to_string(),
            ));
        }
        let max_results = usize::try_from(max_results).map_err(|_| {
            RetrievalError::Validation(format!("max_results must not be negative: {max_results}"))
        })?;
        if !min_score.is_finite() {
            return Err(RetrievalError::Validation(format!(
                "minimum similarity score must be finite: {min_score}"
            )));
        }

        Ok(Self {
            vector,
            max_results,
            min_score,
        })
    }

    /// The query vector.
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Result limit, 0 for unbounded.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Inclusive similarity threshold.
    pub fn min_score(&self) -> f32 {
        self.min_score
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityRecord {
    pub hotel_id: i64,
    pub hotel: String,
    pub details: String,
    pub source: String,

    /// Cosine similarity to the query; higher is more similar.
    pub similarity_score: f32,
}

/// Backend answering similarity queries.
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    /// Records scoring at least the query's threshold, most similar first,
    /// truncated to the query's limit.
    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<SimilarityRecord>>;

    /// Dimension of the stored vectors, if any are stored.
    fn dimension(&self) -> Option<usize>;

    /// Number of stored documents.
    fn len(&self) -> usize;

    /// Whether the store holds no documents.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps every document in memory and scores them all on each query.
#[derive(Debug, Default)]
pub struct InMemorySimilarityStore {
    /// Documents by id.
    documents: HashMap<String, MaintenanceDocument>,

    /// Dimension shared by every document.
    dimension: Option<usize>,
}

impl InMemorySimilarityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from documents.
    pub fn from_documents(documents: Vec<MaintenanceDocument>) -> Result<Self> {
        let mut store = Self::new();
        for document in documents {
            store.insert(document)?;
        }
        Ok(store)
    }

    /// Load a store from a JSON array of documents.
    pub fn from_json(json: &str) -> Result<Self> {
        let documents: Vec<MaintenanceDocument> = serde_json::from_str(json)?;
        let store = Self::from_documents(documents)?;
        info!("Loaded {} documents into similarity store", store.len());
        Ok(store)
    }

    /// Load a store from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RetrievalError::Store(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Add or replace a document. Every document must share one dimension.
    pub fn insert(&mut self, document: MaintenanceDocument) -> Result<()> {
        let actual = document.request_vector.len();
        if actual == 0 {
            return Err(RetrievalError::Store(format!(
                "document {} has an empty vector",
                document.id
            )));
        }
        if let Some(expected) = self.dimension
            && expected != actual
        {
            return Err(RetrievalError::Store(format!(
                "document {} has dimension {actual}, expected {expected}",
                document.id
            )));
        }

        self.dimension = Some(actual);
        debug!("Added document to similarity store: {}", document.id);
        self.documents.insert(document.id.clone(), document);
        Ok(())
    }
}

#[async_trait]
impl SimilarityStore for InMemorySimilarityStore {
    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<SimilarityRecord>> {
        if let Some(expected) = self.dimension
            && expected != query.vector().len()
        {
            return Err(RetrievalError::Validation(format!(
                "query has dimension {}, store has {expected}",
                query.vector().len()
            )));
        }

        let candidates = self
            .documents
            .values()
            .map(|d| (d.id.as_str(), d.request_vector.as_slice()));
        let ranked = rank_by_similarity(
            query.vector(),
            candidates,
            query.max_results(),
            query.min_score(),
        )?;

        Ok(ranked
            .into_iter()
            .filter_map(|hit| {
                self.documents.get(&hit.id).map(|d| SimilarityRecord {
                    hotel_id: d.hotel_id,
                    hotel: d.hotel.clone(),
                    details: d.details.clone(),
                    source: d.source.clone(),
                    similarity_score: hit.score,
                })
            })
            .collect())
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        self.documents.len()
    }
}
