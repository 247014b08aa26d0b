use axum::{extract::State, Json};

use crate::chat::{run_turn, ChatRequest, ChatResponse};
use crate::errors::AppError;
use crate::models::conversation::Role;
use crate::state::AppState;

/// POST /api/v1/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    match req.messages.last() {
        None => return Err(AppError::Validation("messages must not be empty".into())),
        Some(last) if last.role != Role::User => {
            return Err(AppError::Validation(
                "the last message must come from the user".into(),
            ))
        }
        Some(_) => {}
    }
    Ok(Json(run_turn(&state, req).await))
}
