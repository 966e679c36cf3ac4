//! Embedding trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for similarity and response validation.
//!
//! Concrete embedders (OpenAI, Ollama, Hugging Face, fastembed) live in the
//! `symmetriq` app crate.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// An embedding backend.
///
/// Implementations map text to fixed-dimension vectors and are expected to
/// be deterministic for a fixed model. Transport and decoding failures are
/// reported as [`RagError::EmbeddingService`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_many(&[text.to_string()]).await?;
        validate_embeddings(1, self.dims(), &vectors)?;
        Ok(vectors.remove(0))
    }
}

/// Check a batch response against what was requested.
///
/// Rejects a count mismatch, empty vectors, non-finite components, and
/// vectors whose length differs from `dims`. A `dims` of `0` accepts any
/// non-empty length as long as the batch is internally consistent.
pub fn validate_embeddings(expected: usize, dims: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(RagError::EmbeddingService(format!(
            "expected {} vectors, got {}",
            expected,
            vectors.len()
        )));
    }
    let want = if dims > 0 {
        dims
    } else {
        vectors.first().map(Vec::len).unwrap_or(0)
    };
    for (i, v) in vectors.iter().enumerate() {
        if v.is_empty() {
            return Err(RagError::EmbeddingService(format!("vector {} is empty", i)));
        }
        if v.len() != want {
            return Err(RagError::EmbeddingService(format!(
                "vector {} has {} dimensions, expected {}",
                i,
                v.len(),
                want
            )));
        }
        if let Some(j) = v.iter().position(|x| !x.is_finite()) {
            return Err(RagError::EmbeddingService(format!(
                "vector {} has a non-finite component at {}",
                i, j
            )));
        }
    }
    Ok(())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, and
/// zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_validate_count_mismatch() {
        let err = validate_embeddings(2, 3, &[vec![1.0, 2.0, 3.0]]).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingService(_)));
    }

    #[test]
    fn test_validate_wrong_dims() {
        let err = validate_embeddings(1, 3, &[vec![1.0, 2.0]]).unwrap_err();
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn test_validate_empty_vector() {
        let err = validate_embeddings(1, 0, &[vec![]]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_validate_unknown_dims_requires_consistency() {
        assert!(validate_embeddings(2, 0, &[vec![1.0, 2.0], vec![3.0, 4.0]]).is_ok());
        assert!(validate_embeddings(2, 0, &[vec![1.0, 2.0], vec![3.0]]).is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let err = validate_embeddings(2, 2, &[vec![1.0, 0.0], vec![f32::NAN, 0.0]]).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingService(_)));
        assert!(err.to_string().contains("vector 1"));
        assert!(validate_embeddings(1, 0, &[vec![f32::INFINITY]]).is_err());
    }

    struct Fixed;

    #[async_trait]
    impl Embedder for Fixed {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_embed_single_uses_batch() {
        let v = Fixed.embed("abcd").await.unwrap();
        assert_eq!(v, vec![4.0, 1.0]);
    }
}
