//! Chunked upload handlers
//!
//! Clients declare a file, send its chunks in any order (possibly in parallel),
//! then ask for completion. Completion merges the chunks into a `VIDEO`
//! artifact and returns immediately; processing happens in the background and
//! is observed through the media processing status endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use reelforge_core::AppError;
use reelforge_upload::{ChunkReceipt, ChunkResidency, CompletedUpload, InitiateUpload, UploadProgress};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::extractors::Uploader;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadResponse {
    pub upload_id: Uuid,
    pub total_chunks: u32,
    pub chunk_residency: ChunkResidency,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub parent_content_id: Option<Uuid>,
}

/// Start a chunked upload session
#[utoipa::path(
    post,
    path = "/api/v0/uploads/chunked/initiate",
    tag = "uploads",
    request_body = InitiateUpload,
    responses(
        (status = 200, description = "Upload session created", body = InitiateUploadResponse),
        (status = 400, description = "Invalid declaration", body = ErrorResponse)
    )
)]
pub async fn initiate_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<InitiateUpload>,
) -> Result<impl IntoResponse, HttpAppError> {
    let session = state.upload.sessions.initiate(request).await?;

    Ok(Json(InitiateUploadResponse {
        upload_id: session.upload_id,
        total_chunks: session.total_chunks,
        chunk_residency: session.residency,
    }))
}

/// Upload one chunk (raw request body)
#[utoipa::path(
    put,
    path = "/api/v0/uploads/chunked/{upload_id}/chunks/{chunk_index}",
    tag = "uploads",
    params(
        ("upload_id" = Uuid, Path, description = "Upload session ID"),
        ("chunk_index" = u32, Path, description = "Zero-based chunk index")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Chunk stored", body = ChunkReceipt),
        (status = 400, description = "Invalid chunk index or body", body = ErrorResponse),
        (status = 404, description = "Upload session not found", body = ErrorResponse)
    )
)]
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    Path((upload_id, chunk_index)): Path<(Uuid, i64)>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let index = u32::try_from(chunk_index).map_err(|_| {
        AppError::InvalidRequest(format!("Chunk index {} is out of range", chunk_index))
    })?;

    let receipt = state
        .upload
        .sessions
        .record_chunk(upload_id, index, body)
        .await?;

    Ok(Json(receipt))
}

/// Merge all chunks into a video artifact
#[utoipa::path(
    post,
    path = "/api/v0/uploads/chunked/{upload_id}/complete",
    tag = "uploads",
    params(
        ("upload_id" = Uuid, Path, description = "Upload session ID"),
        ("x-uploader-id" = Uuid, Header, description = "Uploader account ID"),
        ("x-uploader-role" = String, Header, description = "admin | editor | author | contributor")
    ),
    request_body(content = CompleteUploadRequest, description = "Optional artifact details"),
    responses(
        (status = 200, description = "Artifact created, processing started", body = CompletedUpload),
        (status = 404, description = "Upload session not found", body = ErrorResponse),
        (status = 409, description = "Chunks still missing", body = ErrorResponse),
        (status = 500, description = "Merge failed", body = ErrorResponse)
    )
)]
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    Uploader(uploader): Uploader,
    Path(upload_id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    // The body is optional, so it is parsed by hand instead of with a Json extractor.
    let request: CompleteUploadRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CompleteUploadRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            AppError::InvalidRequest(format!("Invalid request body: {}", e))
        })?
    };

    let completed = state
        .upload
        .finalizer
        .complete(
            upload_id,
            uploader,
            request.caption,
            request.parent_content_id,
        )
        .await?;

    Ok(Json(completed))
}

/// Cancel an upload and discard its chunks
#[utoipa::path(
    delete,
    path = "/api/v0/uploads/chunked/{upload_id}",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session ID")),
    responses(
        (status = 204, description = "Upload cancelled"),
        (status = 404, description = "Upload session not found", body = ErrorResponse)
    )
)]
pub async fn cancel_upload(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.upload.sessions.cancel(upload_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload progress; unknown sessions report `status = "not_found"`
#[utoipa::path(
    get,
    path = "/api/v0/uploads/chunked/{upload_id}/progress",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session ID")),
    responses(
        (status = 200, description = "Upload progress", body = UploadProgress)
    )
)]
pub async fn upload_progress(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<Uuid>,
) -> impl IntoResponse {
    let progress = state
        .upload
        .sessions
        .progress(upload_id)
        .await
        .unwrap_or_else(UploadProgress::not_found);

    Json(progress)
}
