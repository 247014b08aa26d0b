//! Tool Registry — the closed set of tools the model may ask us to run.
//!
//! Built once at startup (`default_registry`) and shared read-only behind an
//! `Arc`. Handlers receive schema-validated input plus a `ToolContext` with
//! the conversation's files, session store, embeddings and model client.

pub mod ats;
pub mod content;
pub mod definitions;
pub mod prompts;
pub mod resume;
pub mod schema;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::llm_client::{LlmError, ModelClient};
use crate::models::conversation::UploadedFile;
use crate::models::tool::ToolDefinition;
use crate::session::{SessionError, SessionStore};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Execution(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("model call failed: {0}")]
    Model(#[from] LlmError),
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
}

/// Session-scoped data handed to every tool execution.
#[derive(Clone)]
pub struct ToolContext {
    pub conversation_id: Uuid,
    pub files: Arc<[UploadedFile]>,
    pub sessions: Arc<SessionStore>,
    pub embeddings: Arc<EmbeddingProvider>,
    pub model: Arc<dyn ModelClient>,
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    /// Runs the tool. `input` has already been validated against `definition()`.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Name → handler map, iterated in registration order for `schemas()`.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: Vec<Arc<dyn ToolHandler>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        let name = handler.definition().name.clone();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.by_name.insert(name, self.handlers.len());
        self.handlers.push(handler);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.by_name
            .get(name)
            .map(|&i| Arc::clone(&self.handlers[i]))
    }

    pub fn schemas(&self) -> Vec<ToolDefinition> {
        self.handlers
            .iter()
            .map(|h| h.definition().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

/// Registry with the five resume tools.
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(search::SearchContextTool::new()))?;
    registry.register(Arc::new(resume::GenerateSectionTool::new()))?;
    registry.register(Arc::new(resume::OptimizeForAtsTool::new()))?;
    registry.register(Arc::new(content::FindContentTool::new()))?;
    registry.register(Arc::new(content::ReplaceContentTool::new()))?;
    Ok(registry)
}
