use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::{ContentUpdate, SessionContext};
use crate::state::AppState;

/// GET /api/v1/context/:conversation_id
pub async fn handle_get_context(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Json<SessionContext> {
    Json(state.sessions.get_context(conversation_id))
}

/// PUT /api/v1/context/:conversation_id
pub async fn handle_update_context(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(update): Json<ContentUpdate>,
) -> Result<Json<SessionContext>, AppError> {
    if update.content.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "{} content must not be empty",
            update.kind
        )));
    }
    let context = state.sessions.update_content(conversation_id, update)?;
    Ok(Json(context))
}

/// DELETE /api/v1/context/:conversation_id
pub async fn handle_delete_context(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> StatusCode {
    state.sessions.remove(conversation_id);
    StatusCode::NO_CONTENT
}
