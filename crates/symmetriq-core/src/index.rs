//! In-memory vector index.
//!
//! The [`VectorIndex`] trait is the lookup surface the retriever depends on.
//! [`FlatIndex`] implements it with a brute-force cosine scan, which is
//! plenty for corpora of a few thousand segments. An approximate structure
//! can replace it without touching the retriever.
//!
//! An index is built once from all its entries and is immutable afterwards,
//! so it can be shared behind an `Arc` without locking.

use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::models::{ScoredSegment, Segment};

/// Nearest-neighbour lookup over segment embeddings.
pub trait VectorIndex: Send + Sync {
    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality shared by every stored vector.
    fn dims(&self) -> usize;

    /// The `k` entries most similar to `vector`, best first.
    ///
    /// Ties keep segment order. Returns fewer than `k` results only when
    /// the index holds fewer entries.
    fn query(&self, vector: &[f32], k: usize) -> Vec<ScoredSegment>;
}

struct Entry {
    segment: Segment,
    vector: Vec<f32>,
}

/// Brute-force index over `(Segment, vector)` pairs.
pub struct FlatIndex {
    entries: Vec<Entry>,
    dims: usize,
}

impl FlatIndex {
    /// Build an index from segment/embedding pairs, in segment order.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexState`] when `entries` is empty.
    /// - [`RagError::EmbeddingService`] when vectors are empty, contain a
    ///   NaN or infinite component, or their dimensionality differs.
    pub fn build(entries: Vec<(Segment, Vec<f32>)>) -> Result<Self> {
        let dims = match entries.first() {
            Some((_, v)) => v.len(),
            None => return Err(RagError::IndexState("no entries to index".to_string())),
        };
        if dims == 0 {
            return Err(RagError::EmbeddingService(
                "embedding vectors are empty".to_string(),
            ));
        }

        let mut stored = Vec::with_capacity(entries.len());
        for (segment, vector) in entries {
            if vector.len() != dims {
                return Err(RagError::EmbeddingService(format!(
                    "segment {} has {} dimensions, expected {}",
                    segment.index,
                    vector.len(),
                    dims
                )));
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(RagError::EmbeddingService(format!(
                    "segment {} has a non-finite embedding component",
                    segment.index
                )));
            }
            stored.push(Entry { segment, vector });
        }

        Ok(Self {
            entries: stored,
            dims,
        })
    }

    /// Stored segments, in chunk order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.entries.iter().map(|e| &e.segment)
    }
}

impl VectorIndex for FlatIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn query(&self, vector: &[f32], k: usize) -> Vec<ScoredSegment> {
        if k == 0 {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(vector, &e.vector)))
            .collect();
        // sort_by is stable, so equal scores keep insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredSegment {
                segment: self.entries[i].segment.clone(),
                score,
            })
            .collect()
    }
}
