//! Chat turns — the HTTP-facing wrapper around `ToolOrchestrator`.
//!
//! A failed orchestration does not fail the request: the caller gets an
//! assistant message describing the problem plus `meta.error`, so the
//! conversation can carry on.

pub mod handlers;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::models::conversation::{Message, UploadedFile};
use crate::models::tool::ToolUsage;
use crate::state::AppState;
use crate::tools::ToolContext;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub conversation_id: Uuid,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatMeta {
    pub tools_used: Vec<ToolUsage>,
    pub iterations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub message: Message,
    pub meta: ChatMeta,
    /// Tool request/result messages produced this turn, in order. Clients
    /// append these before `message` to keep the tool context in history.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exchange: Vec<Message>,
}

pub fn failure_message(error: &impl std::fmt::Display) -> String {
    format!("Sorry, I ran into a problem: {error}")
}

/// Runs one chat turn against the shared state.
pub async fn run_turn(state: &AppState, request: ChatRequest) -> ChatResponse {
    let ctx = ToolContext {
        conversation_id: request.conversation_id,
        files: Arc::from(request.files),
        sessions: Arc::clone(&state.sessions),
        embeddings: Arc::clone(&state.embeddings),
        model: Arc::clone(&state.model),
    };

    let history_len = request.messages.len();
    match state.orchestrator.run(request.messages, &ctx).await {
        Ok(mut result) => {
            let mut exchange = result
                .messages
                .split_off(history_len.min(result.messages.len()));
            let message = exchange
                .pop()
                .unwrap_or_else(|| Message::assistant(result.text));
            ChatResponse {
                message,
                meta: ChatMeta {
                    tools_used: result.meta.tools_used,
                    iterations: result.meta.iterations,
                    error: None,
                },
                exchange,
            }
        }
        Err(e) => {
            warn!(
                "Chat turn failed for conversation {}: {e}",
                request.conversation_id
            );
            ChatResponse {
                message: Message::assistant(failure_message(&e)),
                meta: ChatMeta {
                    error: Some(e.to_string()),
                    ..Default::default()
                },
                exchange: Vec::new(),
            }
        }
    }
}
