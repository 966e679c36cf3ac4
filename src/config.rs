//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all, via [`load_or_default`]) yields a working configuration that uses
//! the Hugging Face Inference API for both embeddings and generation.
//!
//! ```toml
//! [chunking]
//! max_chars = 500
//! overlap_chars = 50
//!
//! [retrieval]
//! top_k = 2
//! cache_capacity = 4
//!
//! [embedding]
//! provider = "huggingface"
//! model = "sentence-transformers/all-mpnet-base-v2"
//!
//! [generation]
//! provider = "huggingface"
//! model = "mistralai/Mistral-7B-Instruct-v0.2"
//! temperature = 0.5
//! max_output_tokens = 200
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::http::call_budget;
use crate::pipeline::PipelineConfig;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    500
}
fn default_overlap_chars() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Hits scoring below this cosine similarity are not used as context.
    #[serde(default)]
    pub min_score: Option<f32>,
    /// Number of corpus indexes kept in memory.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: None,
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_top_k() -> usize {
    2
}
fn default_cache_capacity() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Expected dimensionality; unset accepts whatever the model returns.
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama, OpenAI-compatible servers, HF endpoints).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "huggingface".to_string()
}
fn default_embedding_model() -> String {
    "sentence-transformers/all-mpnet-base-v2".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "huggingface".to_string()
}
fn default_generation_model() -> String {
    "mistralai/Mistral-7B-Instruct-v0.2".to_string()
}
fn default_temperature() -> f64 {
    0.5
}
fn default_max_output_tokens() -> u32 {
    200
}

impl Config {
    /// Pipeline settings derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            chunk_size: self.chunking.max_chars,
            chunk_overlap: self.chunking.overlap_chars,
            top_k: self.retrieval.top_k,
            min_score: self.retrieval.min_score,
            embedding_model: self.embedding.model.clone(),
            generation_model: self.generation.model.clone(),
            generation_temperature: self.generation.temperature,
            generation_max_tokens: self.generation.max_output_tokens,
            cache_capacity: self.retrieval.cache_capacity,
            embedding_timeout: call_budget(self.embedding.timeout_secs, self.embedding.max_retries),
            generation_timeout: call_budget(
                self.generation.timeout_secs,
                self.generation.max_retries,
            ),
        }
    }
}

/// Parse and validate a TOML configuration string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_chars == 0 {
        bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        bail!("chunking.overlap_chars must be smaller than chunking.max_chars");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.cache_capacity < 1 {
        bail!("retrieval.cache_capacity must be >= 1");
    }
    if let Some(min) = config.retrieval.min_score {
        if !(-1.0..=1.0).contains(&min) {
            bail!("retrieval.min_score must be in [-1.0, 1.0]");
        }
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "openai" | "ollama" | "huggingface" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be openai, ollama, huggingface, or local.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0 when set");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.timeout_secs == 0 {
        bail!("embedding.timeout_secs must be > 0");
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "openai" | "ollama" | "huggingface" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be openai, ollama, or huggingface.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        bail!("generation.temperature must be in [0.0, 2.0]");
    }
    if config.generation.max_output_tokens == 0 {
        bail!("generation.max_output_tokens must be > 0");
    }
    if config.generation.timeout_secs == 0 {
        bail!("generation.timeout_secs must be > 0");
    }

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Load `path` if it exists, otherwise fall back to the built-in defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.chunking.max_chars, 500);
        assert_eq!(cfg.chunking.overlap_chars, 50);
        assert_eq!(cfg.retrieval.top_k, 2);
        assert_eq!(cfg.embedding.provider, "huggingface");
        assert_eq!(cfg.generation.model, "mistralai/Mistral-7B-Instruct-v0.2");
        assert_eq!(cfg.generation.temperature, 0.5);
        assert_eq!(cfg.generation.max_output_tokens, 200);
        assert_eq!(cfg.embedding.max_retries, 0);
    }

    #[test]
    fn test_pipeline_config_mapping() {
        let cfg = parse_config(
            r#"
            [chunking]
            max_chars = 300
            overlap_chars = 30

            [retrieval]
            top_k = 3
            min_score = 0.2

            [generation]
            provider = "ollama"
            model = "llama3"
            timeout_secs = 10
            "#,
        )
        .unwrap();
        let pc = cfg.pipeline_config();
        assert_eq!(pc.chunk_size, 300);
        assert_eq!(pc.chunk_overlap, 30);
        assert_eq!(pc.top_k, 3);
        assert_eq!(pc.min_score, Some(0.2));
        assert_eq!(pc.generation_model, "llama3");
        assert_eq!(pc.generation_timeout, Duration::from_secs(10));
        assert_eq!(pc.embedding_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_retries_extend_call_limit() {
        let cfg = parse_config(
            r#"
            [embedding]
            timeout_secs = 10
            max_retries = 2

            [generation]
            temperature = 0.1
            "#,
        )
        .unwrap();
        let pc = cfg.pipeline_config();
        // 3 attempts of 10s plus 1s and 2s of backoff.
        assert_eq!(pc.embedding_timeout, Duration::from_secs(33));
        assert_eq!(pc.generation_timeout, Duration::from_secs(30));
        assert_eq!(pc.generation_temperature, 0.1);
    }

    #[test]
    fn test_overlap_must_be_smaller() {
        let err = parse_config("[chunking]\nmax_chars = 50\noverlap_chars = 50\n").unwrap_err();
        assert!(err.to_string().contains("overlap_chars"));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_unknown_providers_rejected() {
        assert!(parse_config("[embedding]\nprovider = \"word2vec\"\n").is_err());
        assert!(parse_config("[generation]\nprovider = \"local\"\n").is_err());
    }

    #[test]
    fn test_temperature_range() {
        assert!(parse_config("[generation]\ntemperature = 2.5\n").is_err());
        assert!(parse_config("[generation]\ntemperature = 0.0\n").is_ok());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.retrieval.top_k, 2);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symq.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 5\n").unwrap();
        assert_eq!(load_config(&path).unwrap().retrieval.top_k, 5);
    }
}
