//! Query-time retrieval: embed the query, look it up in the index.

use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::models::{ScoredSegment, Segment};

/// Return the `k` segments most similar to `query`, best first.
pub async fn retrieve<E, I>(embedder: &E, index: &I, query: &str, k: usize) -> Result<Vec<Segment>>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    let hits = retrieve_scored(embedder, index, query, k, None).await?;
    Ok(hits.into_iter().map(|h| h.segment).collect())
}

/// Like [`retrieve`] but keeps scores and drops hits below `min_score`.
///
/// # Errors
///
/// - [`RagError::IndexState`] if the index is empty.
/// - [`RagError::EmbeddingService`] if the query embedding fails, is not
///   finite, or its dimensionality does not match the index.
pub async fn retrieve_scored<E, I>(
    embedder: &E,
    index: &I,
    query: &str,
    k: usize,
    min_score: Option<f32>,
) -> Result<Vec<ScoredSegment>>
where
    E: Embedder + ?Sized,
    I: VectorIndex + ?Sized,
{
    if index.is_empty() {
        return Err(RagError::IndexState(
            "query issued against an empty index".to_string(),
        ));
    }

    let query_vec = embedder.embed(query).await?;
    if query_vec.len() != index.dims() {
        return Err(RagError::EmbeddingService(format!(
            "query embedding has {} dimensions, index has {}",
            query_vec.len(),
            index.dims()
        )));
    }
    if query_vec.iter().any(|x| !x.is_finite()) {
        return Err(RagError::EmbeddingService(
            "query embedding has a non-finite component".to_string(),
        ));
    }

    let mut hits = index.query(&query_vec, k);
    if let Some(floor) = min_score {
        hits.retain(|h| h.score >= floor);
    }
    Ok(hits)
}
