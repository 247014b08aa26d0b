use std::sync::Arc;

use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::llm_client::ModelClient;
use crate::orchestrator::ToolOrchestrator;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Model client shared by the orchestrator and the tools that draft content.
    pub model: Arc<dyn ModelClient>,
    pub sessions: Arc<SessionStore>,
    /// One provider (and vector cache) for the whole process.
    pub embeddings: Arc<EmbeddingProvider>,
    pub orchestrator: Arc<ToolOrchestrator>,
}
