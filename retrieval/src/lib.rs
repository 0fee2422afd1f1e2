//! # Retrieval
//!
//! Semantic search over previously logged maintenance requests.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    RetrievalService                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   embed(text) ──► EmbeddingProvider ──► Embedding               │
//! │                                            │                    │
//! │   search(vector, max_results, min_score)   ▼                    │
//! │        │                            SimilarityQuery             │
//! │        ▼                                   │                    │
//! │   SimilarityStore ◄────────────────────────┘                    │
//! │        │                                                        │
//! │        ▼                                                        │
//! │   Vec<SimilarityRecord>  (cosine, highest first)                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod store;

pub use config::{DEFAULT_MIN_SCORE, RetrievalConfig};
pub use error::{Result, RetrievalError};
pub use service::RetrievalService;
pub use store::{
    InMemorySimilarityStore, MaintenanceDocument, SimilarityQuery, SimilarityRecord,
    SimilarityStore,
};
