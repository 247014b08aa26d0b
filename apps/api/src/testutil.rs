//! Test doubles shared across module tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::embeddings::cache::VectorCache;
use crate::embeddings::model::{FeatureExtractor, HashingExtractor};
use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::llm_client::{LlmError, ModelClient, ModelRequest, ModelResponse, Usage};
use crate::models::conversation::{ContentBlock, UploadedFile};
use crate::orchestrator::{OrchestratorConfig, ToolOrchestrator};
use crate::session::SessionStore;
use crate::state::AppState;
use crate::tools::{default_registry, ToolContext};

// ────────────────────────────────────────────────────────────────────────────
// ScriptedModel
// ────────────────────────────────────────────────────────────────────────────

/// Replays canned responses in order and records every request it receives.
/// When the script runs out, the last response is repeated.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ModelResponse, String>>>,
    last: Mutex<Option<Result<ModelResponse, String>>>,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<ModelResponse, String>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn text(text: &str) -> ModelResponse {
        ModelResponse {
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            stop_reason: Some("end_turn".into()),
            usage: Usage::default(),
        }
    }

    pub fn tool_use(id: &str, name: &str, input: Value) -> ModelResponse {
        ModelResponse {
            content: vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }],
            stop_reason: Some("tool_use".into()),
            usage: Usage::default(),
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match script.pop_front() {
                Some(next) => {
                    *last = Some(next.clone());
                    Some(next)
                }
                None => last.clone(),
            }
        };

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::Api {
                status: 500,
                message,
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CountingExtractor
// ────────────────────────────────────────────────────────────────────────────

/// Hashing extractor that counts calls and can be told to fail.
pub struct CountingExtractor {
    inner: HashingExtractor,
    loads: AtomicUsize,
    extracts: AtomicUsize,
    failing_loads: AtomicUsize,
    failing_texts: HashSet<String>,
    load_delay: Option<Duration>,
}

impl CountingExtractor {
    pub fn new(dims: usize) -> Self {
        Self {
            inner: HashingExtractor::new(dims),
            loads: AtomicUsize::new(0),
            extracts: AtomicUsize::new(0),
            failing_loads: AtomicUsize::new(0),
            failing_texts: HashSet::new(),
            load_delay: None,
        }
    }

    /// The first `n` loads fail.
    pub fn failing_loads(self, n: usize) -> Self {
        self.failing_loads.store(n, Ordering::SeqCst);
        self
    }

    pub fn failing_on(mut self, texts: &[&str]) -> Self {
        self.failing_texts = texts.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn load_calls(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extracts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureExtractor for CountingExtractor {
    async fn load(&self) -> Result<(), EmbeddingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failing_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_loads.store(remaining - 1, Ordering::SeqCst);
            return Err(EmbeddingError::Init("model weights unavailable".into()));
        }
        self.inner.load().await
    }

    async fn extract(&self, text: &str) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.extracts.fetch_add(1, Ordering::SeqCst);
        if self.failing_texts.contains(text) {
            return Err(EmbeddingError::Extraction(format!("refused '{text}'")));
        }
        self.inner.extract(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        "counting"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub const SAMPLE_RESUME: &str = "\
Jane Doe
Summary
Backend engineer focused on Rust and distributed systems.
Experience
Built a payments API in Rust with Axum and PostgreSQL.
Led migration of batch jobs to Kubernetes.
Skills
Rust, Go, PostgreSQL, Kubernetes, Docker
Education
BSc Computer Science, State University
Projects
Open-source CLI for structured log search.";

pub const SAMPLE_JOB: &str = "\
Senior Rust Engineer
Requirements:
- 5+ years building backend services
- Experience with distributed systems
Responsibilities:
- Own the payments platform
- Mentor engineers
Skills: Rust, Kubernetes, Kafka
Nice to have: GraphQL, Terraform";

pub fn hashing_provider() -> Arc<EmbeddingProvider> {
    Arc::new(EmbeddingProvider::new(
        Arc::new(HashingExtractor::new(128)),
        Arc::new(VectorCache::default()),
    ))
}

pub fn tool_context(model: Arc<dyn ModelClient>, files: Vec<UploadedFile>) -> ToolContext {
    ToolContext {
        conversation_id: Uuid::new_v4(),
        files: files.into(),
        sessions: Arc::new(SessionStore::new()),
        embeddings: hashing_provider(),
        model,
    }
}

/// Context whose session already holds the sample resume and job description.
pub fn loaded_tool_context(model: Arc<dyn ModelClient>) -> ToolContext {
    use crate::session::{ContentKind, ContentUpdate};

    let ctx = tool_context(model, Vec::new());
    for (kind, content) in [
        (ContentKind::Resume, SAMPLE_RESUME),
        (ContentKind::JobDescription, SAMPLE_JOB),
    ] {
        ctx.sessions
            .update_content(
                ctx.conversation_id,
                ContentUpdate {
                    kind,
                    content: content.to_string(),
                    version: 1,
                },
            )
            .unwrap();
    }
    ctx
}

/// Full application state over a scripted model and the hashing extractor.
pub fn test_state(model: Arc<ScriptedModel>) -> AppState {
    let config = Config::from_lookup(|key| {
        (key == "ANTHROPIC_API_KEY").then(|| "sk-test".to_string())
    })
    .unwrap();
    let model: Arc<dyn ModelClient> = model;
    let registry = Arc::new(default_registry().unwrap());
    AppState {
        config,
        model: Arc::clone(&model),
        sessions: Arc::new(SessionStore::new()),
        embeddings: hashing_provider(),
        orchestrator: Arc::new(ToolOrchestrator::new(
            model,
            registry,
            OrchestratorConfig::default(),
        )),
    }
}
