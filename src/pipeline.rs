//! Pipeline orchestrator: `ask(corpus, query) -> answer`.
//!
//! # Flow
//!
//! ```text
//! corpus ──▶ chunk ──▶ embed_many ──▶ FlatIndex   (once per corpus, cached)
//!                                         │
//! query ─────────────▶ embed ──▶ top-k ◀──┘ ──▶ compose ──▶ Answer
//! ```
//!
//! Indexes are cached in an LRU keyed by the corpus content hash. The cache
//! lock is held while an index is built, so concurrent callers asking about
//! the same corpus wait for the first build instead of starting their own.
//! A failed build leaves the cache unchanged.
//!
//! Both external services are called under a timeout and surface
//! [`RagError::Timeout`] instead of hanging.

use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use symmetriq_core::chunk::split;
use symmetriq_core::compose::{compose, GenerationOptions, Generator};
use symmetriq_core::embedding::{validate_embeddings, Embedder};
use symmetriq_core::error::{RagError, Result};
use symmetriq_core::index::{FlatIndex, VectorIndex};
use symmetriq_core::models::Answer;
use symmetriq_core::retrieve::retrieve_scored;

use crate::corpus::Corpus;

/// Explicit pipeline settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum segment length, in chars.
    pub chunk_size: usize,
    /// Chars shared by neighbouring segments.
    pub chunk_overlap: usize,
    /// Segments handed to the generator per query.
    pub top_k: usize,
    /// Similarity floor below which retrieved segments are discarded.
    pub min_score: Option<f32>,
    pub embedding_model: String,
    pub generation_model: String,
    pub generation_temperature: f64,
    pub generation_max_tokens: u32,
    /// Maximum number of corpus indexes kept in memory.
    pub cache_capacity: usize,
    pub embedding_timeout: Duration,
    pub generation_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 2,
            min_score: None,
            embedding_model: "sentence-transformers/all-mpnet-base-v2".to_string(),
            generation_model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            generation_temperature: 0.5,
            generation_max_tokens: 200,
            cache_capacity: 4,
            embedding_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.generation_temperature,
            max_output_tokens: self.generation_max_tokens,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    cache: Mutex<LruCache<String, Arc<FlatIndex>>>,
}

impl Pipeline {
    /// # Errors
    ///
    /// [`RagError::InputValidation`] for out-of-range chunking, `top_k`, or
    /// cache settings.
    pub fn new(
        config: PipelineConfig,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(RagError::invalid("chunk_size", "must be > 0"));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::invalid(
                "chunk_overlap",
                "must be smaller than chunk_size",
            ));
        }
        if config.top_k == 0 {
            return Err(RagError::invalid("top_k", "must be >= 1"));
        }
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .ok_or_else(|| RagError::invalid("cache_capacity", "must be >= 1"))?;

        if embedder.model_name() != config.embedding_model {
            tracing::warn!(
                configured = %config.embedding_model,
                provider = embedder.model_name(),
                "embedder model differs from configuration"
            );
        }
        if generator.model_name() != config.generation_model {
            tracing::warn!(
                configured = %config.generation_model,
                provider = generator.model_name(),
                "generator model differs from configuration"
            );
        }

        Ok(Self {
            config,
            embedder,
            generator,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of corpus indexes currently cached.
    pub async fn cached_indexes(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Chunk, embed, and index `corpus` without consulting the cache.
    pub async fn build_index(&self, corpus: &Corpus) -> Result<FlatIndex> {
        if corpus.is_blank() {
            return Err(RagError::invalid("corpus", "is empty"));
        }
        let segments = split(corpus.text(), self.config.chunk_size, self.config.chunk_overlap)?;
        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();

        tracing::info!(
            corpus = &corpus.key()[..12],
            segments = segments.len(),
            model = self.embedder.model_name(),
            "building index"
        );

        let vectors = with_timeout(
            "embedding",
            self.config.embedding_timeout,
            self.embedder.embed_many(&texts),
        )
        .await?;
        validate_embeddings(segments.len(), self.embedder.dims(), &vectors)?;

        FlatIndex::build(segments.into_iter().zip(vectors).collect())
    }

    /// The index for `corpus`, built on first use and cached afterwards.
    pub async fn get_or_build_index(&self, corpus: &Corpus) -> Result<Arc<FlatIndex>> {
        let mut cache = self.cache.lock().await;
        if let Some(index) = cache.get(corpus.key()) {
            tracing::debug!(corpus = &corpus.key()[..12], "index cache hit");
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(self.build_index(corpus).await?);
        if let Some((evicted, _)) = cache.push(corpus.key().to_string(), Arc::clone(&index)) {
            if evicted != corpus.key() {
                tracing::debug!(corpus = &evicted[..12], "evicted cached index");
            }
        }
        Ok(index)
    }

    /// Answer `query` from `corpus`.
    ///
    /// # Errors
    ///
    /// - [`RagError::InputValidation`] for an empty query or corpus, before
    ///   any service call.
    /// - [`RagError::EmbeddingService`], [`RagError::GenerationService`], or
    ///   [`RagError::Timeout`] from the external services.
    pub async fn ask(&self, corpus: &Corpus, query: &str) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(RagError::invalid("query", "is empty"));
        }

        let index = self.get_or_build_index(corpus).await?;

        let hits = with_timeout(
            "embedding",
            self.config.embedding_timeout,
            retrieve_scored(
                self.embedder.as_ref(),
                index.as_ref(),
                query,
                self.config.top_k,
                self.config.min_score,
            ),
        )
        .await?;

        if hits.is_empty() {
            tracing::info!(
                min_score = ?self.config.min_score,
                indexed = index.len(),
                "no relevant context retrieved"
            );
        } else {
            tracing::debug!(
                scores = ?hits.iter().map(|h| h.score).collect::<Vec<_>>(),
                "retrieved segments"
            );
        }
        let segments: Vec<_> = hits.into_iter().map(|h| h.segment).collect();

        let options = self.config.generation_options();
        with_timeout(
            "generation",
            self.config.generation_timeout,
            compose(self.generator.as_ref(), &options, query, &segments),
        )
        .await
    }
}

async fn with_timeout<T, F>(service: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(service, ?limit, "external call timed out");
            Err(RagError::Timeout {
                service,
                secs: limit.as_secs(),
            })
        }
    }
}
