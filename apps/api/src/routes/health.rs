use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::llm_client;
use crate::state::AppState;

/// GET /health
/// Returns service status plus the model and embedding setup in use.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let cache = state.embeddings.cache();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-assistant",
        "model": llm_client::MODEL,
        "max_tool_iterations": state.orchestrator.config().max_iterations,
        "embeddings": {
            "backend": if state.config.embedding_endpoint.is_some() { "http" } else { "hashing" },
            "dimensions": state.embeddings.dimensions(),
            "ready": state.embeddings.is_ready(),
            "cached": cache.len(),
            "ttl_secs": cache.ttl().as_secs(),
        },
    }))
}
