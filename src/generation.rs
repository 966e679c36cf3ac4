//! Concrete text-generation providers.
//!
//! Implements [`Generator`] for:
//! - **[`HuggingFaceGenerator`]**: the Hugging Face Inference API
//!   text-generation task (default; `mistralai/Mistral-7B-Instruct-v0.2`).
//! - **[`OpenAIGenerator`]**: `POST /v1/chat/completions`.
//! - **[`OllamaGenerator`]**: a local Ollama instance's `/api/generate`.
//!
//! Each provider translates [`GenerationOptions`] into its native parameter
//! names and reduces the response to a plain string. Error payloads and
//! unexpected shapes become [`RagError::GenerationService`].

use async_trait::async_trait;
use std::sync::Arc;

use symmetriq_core::compose::{GenerationOptions, Generator};
use symmetriq_core::error::{RagError, Result};

use crate::config::GenerationConfig;
use crate::http::{build_client, env_token, post_json, CallError};

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";
const OPENAI_URL: &str = "https://api.openai.com";
const OLLAMA_URL: &str = "http://localhost:11434";

fn service_error(err: CallError, config: &GenerationConfig) -> RagError {
    err.into_rag("generation", config.timeout_secs, RagError::GenerationService)
}

fn malformed(provider: &str, what: &str) -> RagError {
    RagError::GenerationService(format!("Invalid {} response: {}", provider, what))
}

// ============ Hugging Face ============

/// Generator using the Hugging Face Inference API.
///
/// `HUGGINGFACEHUB_API_TOKEN` is sent as a bearer token when set.
pub struct HuggingFaceGenerator {
    config: GenerationConfig,
    client: reqwest::Client,
    token: Option<String>,
}

impl HuggingFaceGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            client: build_client(config.timeout_secs, RagError::GenerationService)?,
            token: env_token("HUGGINGFACEHUB_API_TOKEN"),
        })
    }
}

/// Build the text-generation request body.
pub(crate) fn hf_request_body(prompt: &str, options: &GenerationOptions) -> serde_json::Value {
    serde_json::json!({
        "inputs": prompt,
        "parameters": {
            "temperature": options.temperature,
            "max_new_tokens": options.max_output_tokens,
            "return_full_text": false,
        },
        "options": { "wait_for_model": true },
    })
}

/// Accepts `[{"generated_text": ...}]` or `{"generated_text": ...}`.
pub(crate) fn parse_hf_generation(json: &serde_json::Value) -> Result<String> {
    if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
        return Err(RagError::GenerationService(format!(
            "Hugging Face error: {}",
            err
        )));
    }
    let item = match json.as_array() {
        Some(items) => items
            .first()
            .ok_or_else(|| malformed("Hugging Face", "empty result array"))?,
        None => json,
    };
    item.get("generated_text")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| malformed("Hugging Face", "missing generated_text"))
}

#[async_trait]
impl Generator for HuggingFaceGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let base = self.config.url.as_deref().unwrap_or(HF_INFERENCE_URL);
        let url = format!("{}/models/{}", base.trim_end_matches('/'), self.config.model);
        let body = hf_request_body(prompt, options);
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
        parse_hf_generation(&json)
    }
}

// ============ OpenAI ============

/// Generator using the OpenAI chat completions API.
///
/// The composed prompt is sent as a single user message. Requires
/// `OPENAI_API_KEY`.
pub struct OpenAIGenerator {
    config: GenerationConfig,
    client: reqwest::Client,
    api_key: String,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = env_token("OPENAI_API_KEY").ok_or_else(|| {
            RagError::GenerationService("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self {
            config: config.clone(),
            client: build_client(config.timeout_secs, RagError::GenerationService)?,
            api_key,
        })
    }
}

pub(crate) fn parse_openai_completion(json: &serde_json::Value) -> Result<String> {
    if let Some(msg) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Err(RagError::GenerationService(format!("OpenAI error: {}", msg)));
    }
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| malformed("OpenAI", "missing choices[0].message.content"))
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let base = self.config.url.as_deref().unwrap_or(OPENAI_URL);
        let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": options.temperature,
            "max_tokens": options.max_output_tokens,
        });
        let json = post_json(
            || self.client.post(&url).bearer_auth(&self.api_key).json(&body),
            self.config.max_retries,
            "OpenAI",
        )
        .await
        .map_err(|e| service_error(e, &self.config))?;
        parse_openai_completion(&json)
    }
}

// ============ Ollama ============

/// Generator using a local Ollama instance (default `http://localhost:11434`).
pub struct OllamaGenerator {
    config: GenerationConfig,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            client: build_client(config.timeout_secs, RagError::GenerationService)?,
        })
    }
}

pub(crate) fn parse_ollama_generation(json: &serde_json::Value) -> Result<String> {
    if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
        return Err(RagError::GenerationService(format!("Ollama error: {}", err)));
    }
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| malformed("Ollama", "missing response"))
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let base = self.config.url.as_deref().unwrap_or(OLLAMA_URL);
        let url = format!("{}/api/generate", base.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_output_tokens,
            },
        });
        let json = post_json(
            || self.client.post(&url).json(&body),
            self.config.max_retries,
            "Ollama",
        )
        .await
        .map_err(|e| service_error(e, &self.config))?;
        parse_ollama_generation(&json)
    }
}

/// Create the [`Generator`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"huggingface"` | [`HuggingFaceGenerator`] |
/// | `"openai"` | [`OpenAIGenerator`] |
/// | `"ollama"` | [`OllamaGenerator`] |
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "huggingface" => Ok(Arc::new(HuggingFaceGenerator::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => Err(RagError::GenerationService(format!(
            "Unknown generation provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hf_body_uses_native_names() {
        let body = hf_request_body(
            "hi",
            &GenerationOptions {
                temperature: 0.5,
                max_output_tokens: 200,
            },
        );
        assert_eq!(body["inputs"], "hi");
        assert_eq!(body["parameters"]["max_new_tokens"], 200);
        assert_eq!(body["parameters"]["temperature"], 0.5);
    }

    #[test]
    fn test_temperature_sent_as_configured() {
        let body = hf_request_body(
            "hi",
            &GenerationOptions {
                temperature: 0.1,
                max_output_tokens: 64,
            },
        );
        assert_eq!(body["parameters"]["temperature"].as_f64(), Some(0.1));
        assert_eq!(
            serde_json::to_string(&body["parameters"]["temperature"]).unwrap(),
            "0.1"
        );
        assert_eq!(body["parameters"]["return_full_text"], false);
    }

    #[test]
    fn test_parse_hf_list_and_object() {
        assert_eq!(
            parse_hf_generation(&json!([{"generated_text": "Eat protein."}])).unwrap(),
            "Eat protein."
        );
        assert_eq!(
            parse_hf_generation(&json!({"generated_text": "Sleep."})).unwrap(),
            "Sleep."
        );
    }

    #[test]
    fn test_parse_hf_errors() {
        assert!(parse_hf_generation(&json!({"error": "Rate limit reached"})).is_err());
        assert!(parse_hf_generation(&json!([])).is_err());
        assert!(parse_hf_generation(&json!([{"text": "x"}])).is_err());
    }

    #[test]
    fn test_parse_openai_completion() {
        let text = parse_openai_completion(&json!({
            "choices": [{"message": {"role": "assistant", "content": "3-5 sessions."}}]
        }))
        .unwrap();
        assert_eq!(text, "3-5 sessions.");
        let err = parse_openai_completion(&json!({"error": {"message": "bad key"}})).unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn test_parse_ollama_generation() {
        assert_eq!(
            parse_ollama_generation(&json!({"response": "Cut first.", "done": true})).unwrap(),
            "Cut first."
        );
        assert!(parse_ollama_generation(&json!({"done": true})).is_err());
    }

    #[test]
    fn test_create_default_generator() {
        let gen = create_generator(&GenerationConfig::default()).unwrap();
        assert_eq!(gen.model_name(), "mistralai/Mistral-7B-Instruct-v0.2");
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_service_error() {
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            url: Some("http://127.0.0.1:9".to_string()),
            ..GenerationConfig::default()
        };
        let gen = OllamaGenerator::new(&config).unwrap();
        let err = gen
            .generate("hello", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::GenerationService(_)));
    }
}
