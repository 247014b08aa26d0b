use axum::{extract::State, Json};
use serde::Deserialize;

use crate::embeddings::provider::{BatchEmbedding, Metadata};
use crate::errors::AppError;
use crate::state::AppState;

const MAX_TEXTS: usize = 256;

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    pub texts: Vec<String>,
    #[serde(default)]
    pub metadata: Option<Vec<Metadata>>,
}

/// POST /api/v1/embeddings
pub async fn handle_embed(
    State(state): State<AppState>,
    Json(req): Json<EmbedRequest>,
) -> Result<Json<BatchEmbedding>, AppError> {
    if req.texts.is_empty() {
        return Err(AppError::Validation("texts must not be empty".into()));
    }
    if req.texts.len() > MAX_TEXTS {
        return Err(AppError::Validation(format!(
            "at most {MAX_TEXTS} texts per request, got {}",
            req.texts.len()
        )));
    }
    if let Some(metadata) = &req.metadata {
        if metadata.len() != req.texts.len() {
            return Err(AppError::Validation(format!(
                "metadata has {} entries but texts has {}",
                metadata.len(),
                req.texts.len()
            )));
        }
    }

    let batch = state
        .embeddings
        .embed_batch(&req.texts, req.metadata.as_deref())
        .await?;
    Ok(Json(batch))
}
