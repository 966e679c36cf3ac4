//! Core data models that flow through the answering pipeline.
//!
//! A corpus is split into [`Segment`]s, each segment is paired with an
//! embedding vector inside the index, and a query produces an [`Answer`].

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A bounded window of corpus text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Position of this segment in chunk order, starting at 0.
    pub index: usize,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

impl Segment {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = sha256_hex(text.as_bytes());
        Self { index, text, hash }
    }
}

/// A segment paired with its similarity to a query vector.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSegment {
    pub segment: Segment,
    pub score: f32,
}

/// Whether an answer was conditioned on retrieved corpus text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grounding {
    Retrieved,
    /// Nothing in the corpus cleared the relevance floor; the model
    /// answered from general knowledge.
    NoRelevantContext,
}

/// Text returned by the answer composer.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Indices of the segments given to the model as context.
    pub sources: Vec<usize>,
    pub grounding: Grounding,
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
