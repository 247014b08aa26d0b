//! Feature extractors — the models behind `EmbeddingProvider`.
//!
//! An extractor returns one feature row per token; pooling and
//! normalization happen in the provider so every backend is treated alike.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::embeddings::EmbeddingError;

pub const DEFAULT_DIMENSIONS: usize = 384;

#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Loads or primes the model. Called once by the provider.
    async fn load(&self) -> Result<(), EmbeddingError>;

    /// Per-token feature rows for `text`, each `dimensions()` long.
    async fn extract(&self, text: &str) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// HashingExtractor — deterministic local backend
// ────────────────────────────────────────────────────────────────────────────

/// Hashes each token with SHA-256 into a fixed-length feature row.
///
/// Identical tokens map to identical rows, so texts that share vocabulary
/// pool to nearby vectors. Needs no network and no model files.
pub struct HashingExtractor {
    dims: usize,
}

impl HashingExtractor {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn token_features(&self, token: &str) -> Vec<f32> {
        let mut row = Vec::with_capacity(self.dims);
        let mut block: u32 = 0;
        while row.len() < self.dims {
            let mut hasher = Sha256::new();
            hasher.update(token.as_bytes());
            hasher.update(block.to_le_bytes());
            let digest = hasher.finalize();
            row.extend(
                digest
                    .iter()
                    .take(self.dims - row.len())
                    // Map byte to [-1, 1]
                    .map(|b| (f32::from(*b) / 127.5) - 1.0),
            );
            block += 1;
        }
        row
    }
}

/// Lower-cased alphanumeric tokens (keeps `+`, `#` and `.` inside words so
/// "C++", "C#" and "Node.js" survive).
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '(' | ')' | '/' | '"'))
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl FeatureExtractor for HashingExtractor {
    async fn load(&self) -> Result<(), EmbeddingError> {
        if self.dims == 0 {
            return Err(EmbeddingError::Init(
                "embedding dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    async fn extract(&self, text: &str) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut tokens = tokenize(text);
        if tokens.is_empty() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(EmbeddingError::EmptyInput);
            }
            tokens.push(trimmed.to_string());
        }
        Ok(tokens.iter().map(|t| self.token_features(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HttpFeatureExtractor — hosted feature-extraction endpoint
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a str,
    options: FeatureOptions,
}

#[derive(Debug, Serialize)]
struct FeatureOptions {
    wait_for_model: bool,
}

/// Endpoints return either token rows or an already pooled vector.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureResponse {
    Tokens(Vec<Vec<f32>>),
    Pooled(Vec<f32>),
}

/// Calls a Hugging Face style `feature-extraction` pipeline over HTTP.
pub struct HttpFeatureExtractor {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    dims: usize,
}

impl HttpFeatureExtractor {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        dims: usize,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            endpoint,
            api_key,
            dims,
        })
    }
}

#[async_trait]
impl FeatureExtractor for HttpFeatureExtractor {
    /// Warm-up probe: one extraction whose width must match `dims`.
    async fn load(&self) -> Result<(), EmbeddingError> {
        let rows = self
            .extract("warm up")
            .await
            .map_err(|e| EmbeddingError::Init(e.to_string()))?;
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width != self.dims {
            return Err(EmbeddingError::Init(format!(
                "endpoint returned {width}-dimensional features, expected {}",
                self.dims
            )));
        }
        info!("Feature extraction endpoint ready at {}", self.endpoint);
        Ok(())
    }

    async fn extract(&self, text: &str) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut request = self.client.post(&self.endpoint).json(&FeatureRequest {
            inputs: text,
            options: FeatureOptions {
                wait_for_model: true,
            },
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Extraction(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let rows = match response.json::<FeatureResponse>().await? {
            FeatureResponse::Tokens(rows) => rows,
            FeatureResponse::Pooled(vector) => vec![vector],
        };
        debug!("Extracted {} feature rows", rows.len());
        Ok(rows)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_tokenize_keeps_language_names() {
        assert_eq!(
            tokenize("Built APIs in C++, C# and Node.js (5 yrs)."),
            vec!["built", "apis", "in", "c++", "c#", "and", "node.js", "5", "yrs"]
        );
    }

    #[tokio::test]
    async fn test_hashing_rows_have_configured_width() {
        let extractor = HashingExtractor::new(100);
        let rows = extractor.extract("rust tokio axum").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 100));
    }

    #[tokio::test]
    async fn test_hashing_is_deterministic_per_token() {
        let extractor = HashingExtractor::new(16);
        let a = extractor.extract("Rust").await.unwrap();
        let b = extractor.extract("rust!").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_hashing_punctuation_only_text_still_embeds() {
        let extractor = HashingExtractor::new(8);
        let rows = extractor.extract("---").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_hashing_zero_dims_fails_to_load() {
        let extractor = HashingExtractor::new(0);
        assert!(matches!(extractor.load().await, Err(EmbeddingError::Init(_))));
    }

    #[tokio::test]
    async fn test_http_extractor_parses_token_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pipeline/feature-extraction"))
            .and(header("authorization", "Bearer hf_test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([[0.1, 0.2], [0.3, 0.4]])),
            )
            .mount(&server)
            .await;

        let extractor = HttpFeatureExtractor::new(
            format!("{}/pipeline/feature-extraction", server.uri()),
            Some("hf_test".into()),
            2,
        )
        .unwrap();

        let rows = extractor.extract("hello world").await.unwrap();
        assert_eq!(rows, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        extractor.load().await.unwrap();
    }

    #[tokio::test]
    async fn test_http_extractor_accepts_pooled_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.5, 0.5, 0.5])))
            .mount(&server)
            .await;

        let extractor = HttpFeatureExtractor::new(server.uri(), None, 3).unwrap();
        let rows = extractor.extract("x").await.unwrap();
        assert_eq!(rows, vec![vec![0.5, 0.5, 0.5]]);
    }

    #[tokio::test]
    async fn test_http_load_rejects_wrong_width() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[0.5, 0.5]])))
            .mount(&server)
            .await;

        let extractor = HttpFeatureExtractor::new(server.uri(), None, 384).unwrap();
        assert!(matches!(extractor.load().await, Err(EmbeddingError::Init(_))));
    }

    #[tokio::test]
    async fn test_http_error_status_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
            .mount(&server)
            .await;

        let extractor = HttpFeatureExtractor::new(server.uri(), None, 2).unwrap();
        let err = extractor.extract("x").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
