//! Answer composition: prompt building and the generation trait.
//!
//! Retrieved segments are "stuffed" into a single prompt ahead of the
//! question. When nothing relevant was retrieved the prompt asks the model
//! to answer from general knowledge, and the resulting [`Answer`] says so.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{RagError, Result};
use crate::models::{Answer, Grounding, Segment};

/// Sampling options passed to the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    /// Randomness of the output; `0.0` is greedy.
    pub temperature: f64,
    /// Cap on generated tokens.
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_output_tokens: 200,
        }
    }
}

/// A text-generation backend.
///
/// Implementations return the raw completion text. Transport failures,
/// error payloads, and undecodable responses are reported as
/// [`RagError::GenerationService`].
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model or repository identifier.
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

const GROUNDED_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

const UNGROUNDED_PREAMBLE: &str = "No trusted reference material matched this question. \
Answer briefly from general fitness knowledge and say that the answer is not based on the reference material.";

/// Build the prompt sent to the generator.
pub fn build_prompt(query: &str, segments: &[Segment]) -> String {
    let mut prompt = String::new();
    if segments.is_empty() {
        prompt.push_str(UNGROUNDED_PREAMBLE);
    } else {
        prompt.push_str(GROUNDED_PREAMBLE);
        for segment in segments {
            prompt.push_str("\n\n");
            prompt.push_str(segment.text.trim());
        }
    }
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(query.trim());
    prompt.push_str("\nHelpful Answer:");
    prompt
}

/// Ask `generator` to answer `query` given the retrieved `segments`.
///
/// # Errors
///
/// Propagates generator errors; an empty completion is reported as
/// [`RagError::GenerationService`].
pub async fn compose<G>(
    generator: &G,
    options: &GenerationOptions,
    query: &str,
    segments: &[Segment],
) -> Result<Answer>
where
    G: Generator + ?Sized,
{
    let prompt = build_prompt(query, segments);
    let raw = generator.generate(&prompt, options).await?;
    let text = raw.trim();
    if text.is_empty() {
        return Err(RagError::GenerationService(format!(
            "{} returned an empty completion",
            generator.model_name()
        )));
    }

    let grounding = if segments.is_empty() {
        Grounding::NoRelevantContext
    } else {
        Grounding::Retrieved
    };

    Ok(Answer {
        text: text.to_string(),
        sources: segments.iter().map(|s| s.index).collect(),
        grounding,
    })
}
