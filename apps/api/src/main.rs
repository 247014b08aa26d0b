mod chat;
mod config;
mod embeddings;
mod errors;
mod llm_client;
mod models;
mod orchestrator;
mod routes;
mod session;
mod state;
mod tools;

#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embeddings::model::{FeatureExtractor, HashingExtractor, HttpFeatureExtractor};
use crate::embeddings::{EmbeddingProvider, VectorCache};
use crate::llm_client::{LlmClient, ModelClient};
use crate::orchestrator::{OrchestratorConfig, ToolOrchestrator};
use crate::routes::build_router;
use crate::session::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume assistant v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let model: Arc<dyn ModelClient> = Arc::new(
        LlmClient::new(config.anthropic_api_key.clone()).context("building LLM client")?,
    );
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize embeddings: remote extractor if configured, local hashing otherwise
    let extractor: Arc<dyn FeatureExtractor> = match &config.embedding_endpoint {
        Some(endpoint) => Arc::new(
            HttpFeatureExtractor::new(
                endpoint.clone(),
                config.embedding_api_key.clone(),
                config.embedding_dimensions,
            )
            .context("building embedding client")?,
        ),
        None => Arc::new(HashingExtractor::new(config.embedding_dimensions)),
    };
    let cache = Arc::new(VectorCache::new(config.embedding_ttl));
    let embeddings = Arc::new(EmbeddingProvider::new(extractor, Arc::clone(&cache)));

    // Warm the model in the background; requests that arrive first wait on the same load
    let warmup = Arc::clone(&embeddings);
    tokio::spawn(async move {
        match warmup.initialize().await {
            Ok(()) => info!("Embedding model ready"),
            Err(e) => warn!("Embedding model failed to load, will retry on first use: {e}"),
        }
    });

    if !config.embedding_sweep_interval.is_zero() {
        let interval = config.embedding_sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        });
        info!("Embedding cache sweep every {}s", interval.as_secs());
    }

    // Build tool registry and orchestrator
    let registry = Arc::new(tools::default_registry()?);
    info!("Registered {} tools", registry.len());
    let orchestrator = Arc::new(ToolOrchestrator::new(
        Arc::clone(&model),
        registry,
        OrchestratorConfig {
            max_iterations: config.max_tool_iterations,
            model_timeout: config.model_timeout,
            max_tokens: config.max_output_tokens,
        },
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        model,
        sessions: Arc::new(SessionStore::new()),
        embeddings,
        orchestrator,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
