//! # Embeddings
//!
//! Text embedding generation and vector similarity for the maintenance
//! copilot's retrieval pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► rank_by_similarity        │
//! │       │                                   │                     │
//! │       ▼                                   ▼                     │
//! │  OpenAI / Azure OpenAI            cosine_similarity             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use provider::{
    AzureDeployment, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, OpenAIProvider,
};
pub use similarity::{SimilarityResult, cosine_similarity, rank_by_similarity};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings (varies by model).
pub const DEFAULT_DIMENSION: usize = 1536; // text-embedding-ada-002
