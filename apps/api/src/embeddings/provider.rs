use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::embeddings::cache::VectorCache;
use crate::embeddings::model::FeatureExtractor;
use crate::embeddings::similarity::{cosine_similarity, l2_normalize, mean_pool};
use crate::embeddings::EmbeddingError;

/// Items embedded concurrently per batch.
pub const BATCH_SIZE: usize = 32;

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, Serialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// A successful batch item, tagged with its position in the input.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(flatten)]
    pub embedding: Embedding,
}

/// Result of `embed_batch`: every item that succeeded plus a joined
/// description of the ones that did not.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchEmbedding {
    pub embeddings: Vec<BatchItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cache key for a text: trimmed, whitespace collapsed, lower-cased.
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Turns text into fixed-length unit vectors, consulting the cache first.
pub struct EmbeddingProvider {
    extractor: Arc<dyn FeatureExtractor>,
    cache: Arc<VectorCache>,
    ready: OnceCell<()>,
}

impl EmbeddingProvider {
    pub fn new(extractor: Arc<dyn FeatureExtractor>, cache: Arc<VectorCache>) -> Self {
        Self {
            extractor,
            cache,
            ready: OnceCell::new(),
        }
    }

    pub fn cache(&self) -> &Arc<VectorCache> {
        &self.cache
    }

    pub fn dimensions(&self) -> usize {
        self.extractor.dimensions()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Loads the extractor once. Concurrent callers wait for the single
    /// in-flight load; after success further calls return immediately.
    /// A failed load leaves the provider uninitialized so the caller can retry.
    pub async fn initialize(&self) -> Result<(), EmbeddingError> {
        self.ready
            .get_or_try_init(|| async {
                info!(
                    "Loading {} feature extractor ({} dims)",
                    self.extractor.name(),
                    self.extractor.dimensions()
                );
                self.extractor.load().await.map_err(|e| match e {
                    EmbeddingError::Init(msg) => EmbeddingError::Init(msg),
                    other => EmbeddingError::Init(other.to_string()),
                })
            })
            .await?;
        Ok(())
    }

    pub async fn embed(
        &self,
        text: &str,
        metadata: Option<Metadata>,
    ) -> Result<Embedding, EmbeddingError> {
        let key = normalize_key(text);
        if key.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        self.initialize().await?;

        if let Some(vector) = self.cache.get(&key) {
            debug!("Embedding cache hit");
            return Ok(Embedding {
                vector: vector.to_vec(),
                text: text.to_string(),
                metadata,
            });
        }

        let tokens = self.extractor.extract(text).await?;
        let mut vector = mean_pool(&tokens, self.extractor.dimensions())?;
        l2_normalize(&mut vector);

        self.cache.set(key, Arc::from(vector.as_slice()));

        Ok(Embedding {
            vector,
            text: text.to_string(),
            metadata,
        })
    }

    /// Embeds `texts` in batches of `BATCH_SIZE`, concurrently within a batch.
    ///
    /// Item failures do not abort the batch: they are collected as
    /// `item {index}: {error}` and joined into `BatchEmbedding::error`.
    /// `metadata[i]`, when present, is attached to `texts[i]`.
    /// Only an initialization failure fails the whole call.
    pub async fn embed_batch(
        &self,
        texts: &[String],
        metadata: Option<&[Metadata]>,
    ) -> Result<BatchEmbedding, EmbeddingError> {
        self.initialize().await?;

        let mut embeddings = Vec::with_capacity(texts.len());
        let mut errors = Vec::new();

        for (batch_no, chunk) in texts.chunks(BATCH_SIZE).enumerate() {
            let offset = batch_no * BATCH_SIZE;
            let pending = chunk.iter().enumerate().map(|(i, text)| {
                let index = offset + i;
                let meta = metadata.and_then(|m| m.get(index)).cloned();
                async move { (index, self.embed(text, meta).await) }
            });

            for (index, result) in join_all(pending).await {
                match result {
                    Ok(embedding) => embeddings.push(BatchItem { index, embedding }),
                    Err(e) => {
                        warn!("Embedding item {index} failed: {e}");
                        errors.push(format!("item {index}: {e}"));
                    }
                }
            }
        }

        debug!(
            "Embedded {} of {} texts ({} failed)",
            embeddings.len(),
            texts.len(),
            errors.len()
        );

        Ok(BatchEmbedding {
            embeddings,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        })
    }

    pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}
