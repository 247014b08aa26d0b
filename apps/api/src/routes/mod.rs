pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::{chat, embeddings, session};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat
        .route("/api/v1/chat", post(chat::handlers::handle_chat))
        // Session context
        .route(
            "/api/v1/context/:conversation_id",
            get(session::handlers::handle_get_context)
                .put(session::handlers::handle_update_context)
                .delete(session::handlers::handle_delete_context),
        )
        // Embeddings
        .route("/api/v1/embeddings", post(embeddings::handlers::handle_embed))
        .with_state(state)
}
