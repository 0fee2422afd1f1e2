//! Similarity computation for embeddings.
//!
//! Everything here uses cosine similarity: higher means more similar, and
//! rankings are ordered from most to least similar.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical vectors
/// - 0.0 means orthogonal vectors
/// - -1.0 means opposite vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// A similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// ID of the matched item.
    pub id: String,

    /// Cosine similarity to the query.
    pub score: f32,
}

impl SimilarityResult {
    /// Create a new similarity result.
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Rank candidates by cosine similarity to `query`.
///
/// Keeps candidates scoring at least `min_score`, sorts them by score
/// descending (ties by id ascending, so equal inputs give equal output) and
/// keeps the first `limit` of them. A `limit` of 0 keeps every qualifying
/// candidate.
pub fn rank_by_similarity<'a, I>(
    query: &[f32],
    candidates: I,
    limit: usize,
    min_score: f32,
) -> Result<Vec<SimilarityResult>>
where
    I: IntoIterator<Item = (&'a str, &'a [f32])>,
{
    let mut scores: Vec<(OrderedFloat<f32>, &str)> = Vec::new();

    for (id, embedding) in candidates {
        let score = cosine_similarity(query, embedding)?;
        if score >= min_score {
            scores.push((OrderedFloat(score), id));
        }
    }

    scores.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    if limit > 0 {
        scores.truncate(limit);
    }

    Ok(scores
        .into_iter()
        .map(|(score, id)| SimilarityResult::new(id, score.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let sim = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(cosine_similarity(&a, &b).is_err());
    }

    #[test]
    fn test_rank_filters_and_sorts_descending() {
        let query = [1.0, 0.0, 0.0];
        let a = [1.0, 0.0, 0.0]; // 1.0
        let b = [0.0, 1.0, 0.0]; // 0.0
        let c = [0.7, 0.7, 0.0]; // ~0.707
        let candidates = vec![("b", &b[..]), ("c", &c[..]), ("a", &a[..])];

        let results = rank_by_similarity(&query, candidates, 0, 0.5).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(results.iter().all(|r| r.score >= 0.5));
    }

    #[test]
    fn test_rank_limit_keeps_prefix() {
        let query = [1.0, 0.0];
        let v1 = [1.0, 0.0];
        let v2 = [0.9, 0.1];
        let v3 = [0.8, 0.2];
        let candidates = vec![("v3", &v3[..]), ("v1", &v1[..]), ("v2", &v2[..])];

        let all = rank_by_similarity(&query, candidates.clone(), 0, 0.0).unwrap();
        let top2 = rank_by_similarity(&query, candidates, 2, 0.0).unwrap();
        assert_eq!(top2, all[..2].to_vec());
    }

    #[test]
    fn test_rank_ties_break_by_id() {
        let query = [1.0, 0.0];
        let v = [1.0, 0.0];
        let candidates = vec![("zeta", &v[..]), ("alpha", &v[..])];

        let results = rank_by_similarity(&query, candidates, 0, 0.0).unwrap();
        assert_eq!(results[0].id, "alpha");
        assert_eq!(results[1].id, "zeta");
    }
}
