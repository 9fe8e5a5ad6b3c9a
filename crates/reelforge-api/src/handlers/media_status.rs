//! Processing status polling
//!
//! Failures of the background processing path are only visible here.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use reelforge_core::{AppError, ProcessingStatusResponse};
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Get an artifact's processing status and extracted metadata
#[utoipa::path(
    get,
    path = "/api/v0/media/{media_id}/processing",
    tag = "media",
    params(("media_id" = Uuid, Path, description = "Media artifact ID")),
    responses(
        (status = 200, description = "Processing status", body = ProcessingStatusResponse),
        (status = 404, description = "Media artifact not found", body = ErrorResponse)
    )
)]
pub async fn get_processing_status(
    State(state): State<Arc<AppState>>,
    Path(media_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let artifact = state
        .processing
        .repository
        .get(media_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Media artifact {}", media_id)))?;

    Ok(Json(ProcessingStatusResponse::from(artifact)))
}
