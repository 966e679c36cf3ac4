//! Concrete embedding providers.
//!
//! Implements [`Embedder`] for:
//! - **[`HuggingFaceEmbedder`]**: the Hugging Face Inference API
//!   feature-extraction pipeline (default; sentence-transformers models).
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings`.
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed`.
//! - **`LocalEmbedder`**: in-process fastembed, behind the
//!   `local-embeddings-fastembed` feature; no network calls after the model
//!   download.
//!
//! Use [`create_embedder`] to instantiate the provider named in
//! `[embedding].provider`.
//!
//! Every provider splits input into `batch_size` requests, validates the
//! returned vectors (count, emptiness, dimensionality), and reports
//! failures as [`RagError::EmbeddingService`] or [`RagError::Timeout`].

use async_trait::async_trait;
use std::sync::Arc;

use symmetriq_core::embedding::{validate_embeddings, Embedder};
use symmetriq_core::error::{RagError, Result};

use crate::config::EmbeddingConfig;
use crate::http::{build_client, env_token, post_json, CallError};

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";
const OPENAI_URL: &str = "https://api.openai.com";
const OLLAMA_URL: &str = "http://localhost:11434";

fn service_error(err: CallError, config: &EmbeddingConfig) -> RagError {
    err.into_rag("embedding", config.timeout_secs, RagError::EmbeddingService)
}

/// Run `call` over `texts` in `batch_size` slices and validate the result.
async fn embed_batched<'a, F, Fut>(
    config: &'a EmbeddingConfig,
    texts: &'a [String],
    call: F,
) -> Result<Vec<Vec<f32>>>
where
    F: Fn(&'a [String]) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<Vec<f32>>>>,
{
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(config.batch_size.max(1)) {
        let vectors = call(batch).await?;
        validate_embeddings(batch.len(), config.dims.unwrap_or(0), &vectors)?;
        out.extend(vectors);
    }
    validate_embeddings(texts.len(), config.dims.unwrap_or(0), &out)?;
    Ok(out)
}

/// Parse a JSON array of float arrays.
fn parse_matrix(value: &serde_json::Value, what: &str) -> Result<Vec<Vec<f32>>> {
    let rows = value
        .as_array()
        .ok_or_else(|| RagError::EmbeddingService(format!("Invalid {} response: expected an array", what)))?;

    rows.iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| {
                    RagError::EmbeddingService(format!(
                        "Invalid {} response: embedding is not an array",
                        what
                    ))
                })?
                .iter()
                .map(|v| {
                    v.as_f64().map(|f| f as f32).ok_or_else(|| {
                        RagError::EmbeddingService(format!(
                            "Invalid {} response: non-numeric component",
                            what
                        ))
                    })
                })
                .collect()
        })
        .collect()
}

// ============ Hugging Face ============

/// Embedder using the Hugging Face Inference API.
///
/// Sends `{"inputs": [...]}` to `/pipeline/feature-extraction/<model>` and
/// expects one pooled vector per input. `HUGGINGFACEHUB_API_TOKEN` is sent
/// as a bearer token when set.
pub struct HuggingFaceEmbedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
    token: Option<String>,
}

impl HuggingFaceEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            client: build_client(config.timeout_secs, RagError::EmbeddingService)?,
            token: env_token("HUGGINGFACEHUB_API_TOKEN"),
        })
    }
}

/// Parse a feature-extraction response.
///
/// Sentence-transformers models return `[[f32; dims]; n]`. Token-level
/// models return `[[[f32; dims]; tokens]; n]`; those are mean-pooled.
pub(crate) fn parse_hf_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
        return Err(RagError::EmbeddingService(format!(
            "Hugging Face error: {}",
            err
        )));
    }
    let rows = json.as_array().ok_or_else(|| {
        RagError::EmbeddingService("Invalid Hugging Face response: expected an array".to_string())
    })?;

    let token_level = rows
        .first()
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .map(|v| v.is_array())
        .unwrap_or(false);

    if !token_level {
        return parse_matrix(json, "Hugging Face");
    }

    rows.iter()
        .map(|row| {
            let tokens = parse_matrix(row, "Hugging Face")?;
            mean_pool(&tokens).ok_or_else(|| {
                RagError::EmbeddingService("Hugging Face returned no token vectors".to_string())
            })
        })
        .collect()
}

fn mean_pool(tokens: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dims = tokens.first()?.len();
    let mut sum = vec![0.0f32; dims];
    for t in tokens {
        for (acc, v) in sum.iter_mut().zip(t) {
            *acc += v;
        }
    }
    let n = tokens.len() as f32;
    Some(sum.into_iter().map(|v| v / n).collect())
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model_name(&self) -> &str {
        &self.config.model
    }
    fn dims(&self) -> usize {
        self.config.dims.unwrap_or(0)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.config.url.as_deref().unwrap_or(HF_INFERENCE_URL);
        let url = format!(
            "{}/pipeline/feature-extraction/{}",
            base.trim_end_matches('/'),
            self.config.model
        );
        embed_batched(&self.config, texts, |batch| {
            let url = url.clone();
            async move {
                let body = serde_json::json!({
                    "inputs": batch,
                    "options": { "wait_for_model": true },
                });
                let json = post_json(
                    || {
                        let req = self.client.post(&url).json(&body);
                        match &self.token {
                            Some(t) => req.bearer_auth(t),
                            None => req,
                        }
                    },
                    self.config.max_retries,
                    "Hugging Face",
                )
                .await
                .map_err(|e| service_error(e, &self.config))?;
                parse_hf_embeddings(&json)
            }
        })
        .await
    }
}

// ============ OpenAI ============

/// Embedder using the OpenAI embeddings API.
///
/// Requires the `OPENAI_API_KEY` environment variable. `url` may point at
/// any OpenAI-compatible server.
pub struct OpenAIEmbedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
    api_key: String,
}

impl OpenAIEmbedder {
    /// # Errors
    ///
    /// [`RagError::EmbeddingService`] if `OPENAI_API_KEY` is not set.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = env_token("OPENAI_API_KEY").ok_or_else(|| {
            RagError::EmbeddingService("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self {
            config: config.clone(),
            client: build_client(config.timeout_secs, RagError::EmbeddingService)?,
            api_key,
        })
    }
}

/// Extract `data[].embedding`, ordered by `data[].index`.
pub(crate) fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| {
            RagError::EmbeddingService("Invalid OpenAI response: missing data array".to_string())
        })?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item.get("embedding").ok_or_else(|| {
            RagError::EmbeddingService("Invalid OpenAI response: missing embedding".to_string())
        })?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let mut row = parse_matrix(&serde_json::Value::Array(vec![embedding.clone()]), "OpenAI")?;
        indexed.push((index, row.remove(0)));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.config.model
    }
    fn dims(&self) -> usize {
        self.config.dims.unwrap_or(0)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.config.url.as_deref().unwrap_or(OPENAI_URL);
        let url = format!("{}/v1/embeddings", base.trim_end_matches('/'));
        embed_batched(&self.config, texts, |batch| {
            let url = url.clone();
            async move {
                let mut body = serde_json::json!({
                    "model": self.config.model,
                    "input": batch,
                });
                if let Some(dims) = self.config.dims {
                    body["dimensions"] = serde_json::json!(dims);
                }
                let json = post_json(
                    || {
                        self.client
                            .post(&url)
                            .bearer_auth(&self.api_key)
                            .json(&body)
                    },
                    self.config.max_retries,
                    "OpenAI",
                )
                .await
                .map_err(|e| service_error(e, &self.config))?;
                parse_openai_embeddings(&json)
            }
        })
        .await
    }
}

// ============ Ollama ============

/// Embedder using a local Ollama instance (default `http://localhost:11434`).
///
/// Requires an embedding model to be pulled, e.g. `ollama pull nomic-embed-text`.
pub struct OllamaEmbedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            client: build_client(config.timeout_secs, RagError::EmbeddingService)?,
        })
    }
}

pub(crate) fn parse_ollama_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json.get("embeddings").ok_or_else(|| {
        RagError::EmbeddingService("Invalid Ollama response: missing embeddings array".to_string())
    })?;
    parse_matrix(embeddings, "Ollama")
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.config.model
    }
    fn dims(&self) -> usize {
        self.config.dims.unwrap_or(0)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.config.url.as_deref().unwrap_or(OLLAMA_URL);
        let url = format!("{}/api/embed", base.trim_end_matches('/'));
        embed_batched(&self.config, texts, |batch| {
            let url = url.clone();
            async move {
                let body = serde_json::json!({
                    "model": self.config.model,
                    "input": batch,
                });
                let json = post_json(
                    || self.client.post(&url).json(&body),
                    self.config.max_retries,
                    "Ollama",
                )
                .await
                .map_err(|e| service_error(e, &self.config))?;
                parse_ollama_embeddings(&json)
            }
        })
        .await
    }
}

// ============ Local (fastembed) ============

/// In-process embedder backed by fastembed.
///
/// The model is downloaded from Hugging Face on first use and cached.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalEmbedder {
    config: EmbeddingConfig,
    model: Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
    dims: usize,
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    match name {
        "all-minilm-l6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok((fastembed::EmbeddingModel::AllMiniLML6V2, 384))
        }
        "bge-small-en-v1.5" => Ok((fastembed::EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((fastembed::EmbeddingModel::BGEBaseENV15, 768)),
        "nomic-embed-text-v1.5" => Ok((fastembed::EmbeddingModel::NomicEmbedTextV15, 768)),
        other => Err(RagError::EmbeddingService(format!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, nomic-embed-text-v1.5",
            other
        ))),
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = config_to_fastembed_model(&config.model)?;
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(model).with_show_download_progress(true),
        )
        .map_err(|e| {
            RagError::EmbeddingService(format!("Failed to initialize local embedding model: {}", e))
        })?;
        Ok(Self {
            config: config.clone(),
            model: Arc::new(std::sync::Mutex::new(model)),
            dims: config.dims.unwrap_or(dims),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.config.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let batch_size = self.config.batch_size;
        let texts = texts.to_vec();
        let expected = texts.len();
        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RagError::EmbeddingService("local model lock poisoned".to_string()))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| RagError::EmbeddingService(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| RagError::EmbeddingService(format!("Local embedding task failed: {}", e)))??;
        validate_embeddings(expected, self.dims, &vectors)?;
        Ok(vectors)
    }
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"huggingface"` | [`HuggingFaceEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (requires `local-embeddings-fastembed`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "huggingface" => Ok(Arc::new(HuggingFaceEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(RagError::EmbeddingService(
            "Local embedding provider requires --features local-embeddings-fastembed".to_string(),
        )),
        other => Err(RagError::EmbeddingService(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hf_sentence_vectors() {
        let v = parse_hf_embeddings(&json!([[0.1, 0.2], [0.3, 0.4]])).unwrap();
        assert_eq!(v, vec![vec![0.1f32, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn test_parse_hf_token_vectors_mean_pooled() {
        let v = parse_hf_embeddings(&json!([[[1.0, 0.0], [3.0, 2.0]]])).unwrap();
        assert_eq!(v, vec![vec![2.0f32, 1.0]]);
    }

    #[test]
    fn test_parse_hf_error_payload() {
        let err = parse_hf_embeddings(&json!({"error": "Model is loading"})).unwrap_err();
        assert!(err.to_string().contains("Model is loading"));
    }

    #[test]
    fn test_parse_openai_orders_by_index() {
        let v = parse_openai_embeddings(&json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        }))
        .unwrap();
        assert_eq!(v, vec![vec![1.0f32, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_openai_missing_data() {
        assert!(matches!(
            parse_openai_embeddings(&json!({"object": "list"})),
            Err(RagError::EmbeddingService(_))
        ));
    }

    #[test]
    fn test_parse_ollama() {
        let v = parse_ollama_embeddings(&json!({"embeddings": [[0.5, 0.5, 0.0]]})).unwrap();
        assert_eq!(v[0].len(), 3);
        assert!(parse_ollama_embeddings(&json!({"embeddings": [["x"]]})).is_err());
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn test_create_default_provider() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "sentence-transformers/all-mpnet-base-v2");
        assert_eq!(embedder.dims(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_service_error() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            url: Some("http://127.0.0.1:9".to_string()),
            ..EmbeddingConfig::default()
        };
        let embedder = OllamaEmbedder::new(&config).unwrap();
        let err = embedder
            .embed_many(&["hello".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_service_error());
    }
}
