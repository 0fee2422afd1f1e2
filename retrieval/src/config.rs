//! Configuration for the retrieval service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default similarity threshold for searches that do not supply one.
pub const DEFAULT_MIN_SCORE: f32 = 0.8;

/// Configuration for the retrieval service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity a record needs to be returned.
    pub default_min_score: f32,

    /// Maximum number of results (0 for all qualifying).
    pub default_max_results: usize,

    /// Timeout for one embedding or store call, in milliseconds.
    pub request_timeout_ms: u64,

    /// Dimension every vector must have, when known.
    pub expected_dimension: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_min_score: DEFAULT_MIN_SCORE,
            default_max_results: 0,
            request_timeout_ms: 30_000,
            expected_dimension: None,
        }
    }
}

impl RetrievalConfig {
    /// Set the default similarity threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.default_min_score = min_score;
        self
    }

    /// Set the default result limit.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.default_max_results = max_results;
        self
    }

    /// Set the per-call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Require vectors of the given dimension.
    pub fn with_expected_dimension(mut self, dimension: usize) -> Self {
        self.expected_dimension = Some(dimension);
        self
    }

    /// The per-call timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
