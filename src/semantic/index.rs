//! Similarity backends for course search.
//!
//! A backend ranks stored vectors against a query vector and returns
//! (position, score) pairs. Score-floor and top-k semantics live above the
//! trait in `select`, so exact and approximate backends are interchangeable.

use std::cmp::Ordering;

/// One ranked hit from a similarity backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    /// Position of the matched vector in the course's record sequence
    pub position: usize,
    /// Cosine similarity score
    pub score: f32,
}

/// A pluggable nearest-neighbor strategy over the active course's vectors.
pub trait SimilarityBackend {
    /// Rank stored vectors against `query`, best first, at most `k` hits.
    ///
    /// Ties must be broken by ascending position so results are
    /// deterministic for identical input.
    fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<ScoredHit>, IndexError>;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact in-memory backend: brute-force cosine similarity over all vectors.
///
/// Vectors are stored positionally; position `i` corresponds to the course's
/// record `i`.
pub struct ExactIndex {
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot store or search with zero-norm vector")]
    ZeroNormVector,
}

impl ExactIndex {
    /// Build an index from an ordered vector sequence.
    ///
    /// All vectors must share one dimension and have non-zero norm.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let dimensions = vectors.first().map(|v| v.len()).unwrap_or(0);

        for v in &vectors {
            if v.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    got: v.len(),
                });
            }
            if l2_norm(v) < f32::EPSILON {
                return Err(IndexError::ZeroNormVector);
            }
        }

        Ok(Self {
            vectors,
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl SimilarityBackend for ExactIndex {
    fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<ScoredHit>, IndexError> {
        if self.vectors.is_empty() {
            return Ok(vec![]);
        }

        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        if query_norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        let mut hits: Vec<ScoredHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, target)| ScoredHit {
                position,
                score: cosine_similarity(query, target, query_norm),
            })
            .collect();

        // Score descending, position ascending on equal scores
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });

        hits.truncate(k);

        Ok(hits)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Compute cosine similarity between two vectors.
/// Assumes query_norm is precomputed for efficiency.
fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return 0.0;
    }

    let dot_product: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    dot_product / (query_norm * target_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_empty() {
        let index = ExactIndex::build(vec![]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), 0);
    }

    #[test]
    fn test_build_dimension_mismatch() {
        let result = ExactIndex::build(vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]]);
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        ));
    }

    #[test]
    fn test_build_zero_norm_rejected() {
        let result = ExactIndex::build(vec![vec![0.0, 0.0, 0.0]]);
        assert!(matches!(result, Err(IndexError::ZeroNormVector)));
    }

    #[test]
    fn test_top_k_ranks_by_similarity() {
        let index = ExactIndex::build(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.9, 0.1, 0.0],
        ])
        .unwrap();

        let results = index.top_k(&[1.0, 0.0, 0.0], 10).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].position, 0);
        assert!((results[0].score - 1.0).abs() < 0.01);
        assert_eq!(results[1].position, 2);
        assert_eq!(results[2].position, 1);
    }

    #[test]
    fn test_top_k_truncates() {
        let vectors = (0..10).map(|i| vec![1.0, i as f32 * 0.1, 0.0]).collect();
        let index = ExactIndex::build(vectors).unwrap();

        let results = index.top_k(&[1.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_top_k_tie_breaks_by_position() {
        // Identical vectors produce identical scores; first-seen wins
        let index = ExactIndex::build(vec![
            vec![0.0, 1.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
        ])
        .unwrap();

        let results = index.top_k(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].position, 2);
    }

    #[test]
    fn test_top_k_query_dimension_mismatch() {
        let index = ExactIndex::build(vec![vec![1.0, 0.0, 0.0]]).unwrap();
        let result = index.top_k(&[1.0, 0.0], 10);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_top_k_zero_norm_query() {
        let index = ExactIndex::build(vec![vec![1.0, 0.0, 0.0]]).unwrap();
        let result = index.top_k(&[0.0, 0.0, 0.0], 10);
        assert!(matches!(result, Err(IndexError::ZeroNormVector)));
    }

    #[test]
    fn test_top_k_deterministic() {
        let index = ExactIndex::build(vec![
            vec![0.5, 0.5, 0.0],
            vec![0.7, 0.3, 0.0],
            vec![0.1, 0.9, 0.0],
        ])
        .unwrap();

        let a = index.top_k(&[1.0, 0.2, 0.0], 10).unwrap();
        let b = index.top_k(&[1.0, 0.2, 0.0], 10).unwrap();
        assert_eq!(a, b);
    }
}
