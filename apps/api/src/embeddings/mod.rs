//! Embeddings — feature extraction, pooling, caching and similarity.
//!
//! Flow: text → normalized cache key → `VectorCache` hit, or
//!       `FeatureExtractor` token features → mean pool → L2 normalize → cache.
//!
//! One `EmbeddingProvider` (and its `VectorCache`) is built in `main` and
//! shared through `AppState`; nothing here is a global.

pub mod batch;
pub mod cache;
pub mod handlers;
pub mod model;
pub mod provider;
pub mod similarity;

use thiserror::Error;

pub use cache::VectorCache;
pub use provider::EmbeddingProvider;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding model failed to initialize: {0}")]
    Init(String),

    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Feature extraction failed: {0}")]
    Extraction(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
