//! Similarity ranking over the in-memory corpus.
//!
//! A linear scan: every chunk is scored against the query with cosine
//! similarity, scores are sorted descending, and the first `top_k` are kept.
//! Ties keep corpus order, so ranking is deterministic.

use crate::corpus::{Chunk, CorpusStore};
use crate::error::{Result, UzhavanError};

/// A chunk paired with its similarity to the query. Most similar first.
#[derive(Debug, Clone, Copy)]
pub struct RankedResult<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// Euclidean norm.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute cosine similarity between two vectors.
///
/// Zero-norm inputs are rejected instead of producing NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(UzhavanError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(UzhavanError::DegenerateVector(
            "cosine similarity is undefined for a zero vector".to_string(),
        ));
    }
    if !norm_a.is_finite() || !norm_b.is_finite() {
        return Err(UzhavanError::DegenerateVector(
            "vector norm is not finite".to_string(),
        ));
    }

    Ok(dot(a, b) / (norm_a * norm_b))
}

/// Rank every chunk in `corpus` against `query` and return the best `top_k`.
///
/// Returns `min(top_k, corpus.len())` results. An empty corpus gives an empty
/// result. A zero query vector is a `DegenerateVector` error.
pub fn rank<'a>(query: &[f32], corpus: &'a CorpusStore, top_k: usize) -> Result<Vec<RankedResult<'a>>> {
    let query_norm = l2_norm(query);
    if query_norm == 0.0 || !query_norm.is_finite() {
        return Err(UzhavanError::DegenerateVector(
            "query embedding has zero or non-finite norm".to_string(),
        ));
    }

    if let Some(expected) = corpus.dimensions() {
        if query.len() != expected {
            return Err(UzhavanError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
    }

    let mut results: Vec<RankedResult<'a>> = corpus
        .chunks()
        .iter()
        .map(|chunk| RankedResult {
            chunk,
            score: dot(query, chunk.embedding()) / (query_norm * chunk.norm()),
        })
        .collect();

    // Stable sort: equal scores stay in corpus order.
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(top_k);

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(vectors: &[Vec<f32>]) -> CorpusStore {
        let chunks = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| Chunk::new(format!("c{}", i + 1), format!("text {}", i + 1), v.clone()).unwrap())
            .collect();
        CorpusStore::new(chunks).unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).unwrap().abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d).unwrap() + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_self_similarity_and_symmetry() {
        let a = vec![0.3, -1.2, 4.5, 0.01];
        let b = vec![2.0, 0.5, -0.7, 3.3];

        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-5);
        assert_eq!(
            cosine_similarity(&a, &b).unwrap(),
            cosine_similarity(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_zero_vector_is_degenerate() {
        let zero = vec![0.0, 0.0];
        let other = vec![1.0, 0.0];
        assert!(matches!(
            cosine_similarity(&zero, &other),
            Err(UzhavanError::DegenerateVector(_))
        ));
        assert!(matches!(
            cosine_similarity(&other, &zero),
            Err(UzhavanError::DegenerateVector(_))
        ));
    }

    #[test]
    fn test_rank_returns_top_k_sorted() {
        let store = corpus(&[
            vec![0.0, 1.0],
            vec![1.0, 0.1],
            vec![0.7, 0.7],
            vec![-1.0, 0.0],
        ]);

        let results = rank(&[1.0, 0.0], &store, 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.id(), "c2");
        assert_eq!(results[1].chunk.id(), "c3");
        assert_eq!(results[2].chunk.id(), "c1");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_top_k_larger_than_corpus() {
        let store = corpus(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
        let results = rank(&[1.0, 1.0], &store, 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_rank_empty_corpus() {
        let store = CorpusStore::default();
        assert!(rank(&[1.0, 0.0], &store, 0).unwrap().is_empty());
        assert!(rank(&[1.0, 0.0], &store, 5).unwrap().is_empty());
    }

    #[test]
    fn test_rank_zero_query_is_degenerate() {
        let store = corpus(&[vec![1.0, 0.0]]);
        assert!(matches!(
            rank(&[0.0, 0.0], &store, 1),
            Err(UzhavanError::DegenerateVector(_))
        ));
    }

    #[test]
    fn test_rank_ties_keep_corpus_order() {
        let store = corpus(&[vec![2.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![5.0, 0.0]]);
        let results = rank(&[1.0, 0.0], &store, 3).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id()).collect();
        assert_eq!(ids, vec!["c1", "c3", "c4"]);
    }

    #[test]
    fn test_rank_dimension_mismatch() {
        let store = corpus(&[vec![1.0, 0.0]]);
        assert!(matches!(
            rank(&[1.0, 0.0, 0.0], &store, 1),
            Err(UzhavanError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }
}
