//! OpenAPI documentation

use utoipa::OpenApi;

use crate::error;
use crate::handlers;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reelforge API",
        version = "0.1.0",
        description = "Chunked video ingestion: resumable uploads, in-order merge, and background metadata/thumbnail processing with role-gated approval. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::chunked_upload::initiate_upload,
        handlers::chunked_upload::upload_chunk,
        handlers::chunked_upload::complete_upload,
        handlers::chunked_upload::cancel_upload,
        handlers::chunked_upload::upload_progress,
        handlers::media_status::get_processing_status,
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::chunked_upload::InitiateUploadResponse,
        handlers::chunked_upload::CompleteUploadRequest,
        handlers::health::HealthResponse,
        reelforge_upload::InitiateUpload,
        reelforge_upload::ChunkReceipt,
        reelforge_upload::CompletedUpload,
        reelforge_upload::ChunkResidency,
        reelforge_upload::UploadProgress,
        reelforge_upload::UploadStatus,
        reelforge_core::ProcessingStatusResponse,
        reelforge_core::ProcessingStatus,
        reelforge_core::MediaType,
    )),
    tags(
        (name = "uploads", description = "Chunked upload sessions"),
        (name = "media", description = "Media artifact processing status"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;
