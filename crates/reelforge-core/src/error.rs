//! Error types module
//!
//! All pipeline errors are unified under the `AppError` enum. Upload-path variants
//! (`InvalidRequest`, `SessionNotFound`, `InvalidChunkIndex`, `IncompleteUpload`,
//! `MergeError`) are surfaced to the caller synchronously. Processing-path variants
//! (`MetadataExtraction`, `Thumbnail`, `FilesystemCleanup`) are isolated per artifact
//! and only ever observed through logs and status polling.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

use uuid::Uuid;

use crate::models::ProcessingStatus;

const MAX_CAUSES: usize = 5;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Severity an error is logged at when it reaches the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes: bad input, unknown sessions, missing chunks.
    Debug,
    Warn,
    /// Server-side faults the operator should look at.
    Error,
}

/// How an error is presented to API clients and to the log pipeline.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable machine-readable code, e.g. `SESSION_NOT_FOUND`.
    fn error_code(&self) -> &'static str;

    /// Retrying the same call (possibly after fixing state) can succeed.
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to return to the client.
    fn client_message(&self) -> String;

    /// Details (paths, driver messages) must not leave the server in production.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upload session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Invalid chunk index {index}: expected 0..{total}")]
    InvalidChunkIndex { index: u32, total: u32 },

    #[error("Incomplete upload: {received}/{total} chunks received")]
    IncompleteUpload { received: u32, total: u32 },

    #[error("Merge error: {0}")]
    MergeError(String),

    #[error("Metadata extraction failed: {0}")]
    MetadataExtraction(String),

    #[error("Thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("Filesystem cleanup failed: {0}")]
    FilesystemCleanup(String),

    #[error("Artifact {media_id} cannot start processing from status {from}")]
    InvalidTransition {
        media_id: Uuid,
        from: ProcessingStatus,
    },

    #[error("Artifact {0} is already being processed")]
    AlreadyInFlight(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidRequest(format!("UUID parsing error: {}", err))
    }
}

struct Presentation {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

const RETRY_LATER: Option<&str> = Some("Retry the request later");

impl AppError {
    fn presentation(&self) -> Presentation {
        let (status, code, recoverable, action, sensitive, level) = match self {
            AppError::Database(_) => (500, "DATABASE_ERROR", true, RETRY_LATER, true, LogLevel::Error),
            AppError::Storage(_) => (500, "STORAGE_ERROR", true, RETRY_LATER, true, LogLevel::Error),
            AppError::InvalidRequest(_) => (
                400,
                "INVALID_REQUEST",
                false,
                Some("Fix the request fields and send it again"),
                false,
                LogLevel::Debug,
            ),
            AppError::SessionNotFound(_) => (
                404,
                "SESSION_NOT_FOUND",
                false,
                Some("Initiate a new upload session"),
                false,
                LogLevel::Debug,
            ),
            AppError::InvalidChunkIndex { .. } => (
                400,
                "INVALID_CHUNK_INDEX",
                false,
                Some("Send chunk indices between 0 and totalChunks - 1"),
                false,
                LogLevel::Debug,
            ),
            AppError::IncompleteUpload { .. } => (
                409,
                "INCOMPLETE_UPLOAD",
                true,
                Some("Upload the missing chunks, then complete again"),
                false,
                LogLevel::Debug,
            ),
            AppError::MergeError(_) => (
                500,
                "MERGE_ERROR",
                true,
                Some("Retry completion; re-send chunks if the error persists"),
                true,
                LogLevel::Error,
            ),
            AppError::MetadataExtraction(_) => (
                422,
                "METADATA_EXTRACTION_ERROR",
                true,
                Some("The file will be retried by the background sweep"),
                false,
                LogLevel::Warn,
            ),
            AppError::Thumbnail(_) => (500, "THUMBNAIL_ERROR", true, None, false, LogLevel::Warn),
            AppError::FilesystemCleanup(_) => {
                (500, "FILESYSTEM_CLEANUP_ERROR", true, None, true, LogLevel::Warn)
            }
            AppError::InvalidTransition { .. } => (
                409,
                "INVALID_STATUS_TRANSITION",
                false,
                Some("Poll the processing status instead of resubmitting"),
                false,
                LogLevel::Debug,
            ),
            AppError::AlreadyInFlight(_) => (
                409,
                "ALREADY_PROCESSING",
                true,
                Some("Poll the processing status"),
                false,
                LogLevel::Debug,
            ),
            AppError::NotFound(_) => (
                404,
                "NOT_FOUND",
                false,
                Some("Check the media ID"),
                false,
                LogLevel::Debug,
            ),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                (500, "INTERNAL_ERROR", true, RETRY_LATER, true, LogLevel::Error)
            }
        };

        Presentation {
            status,
            code,
            recoverable,
            action,
            sensitive,
            level,
        }
    }

    /// Variant name reported as `errorType` outside production.
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidRequest(_) => "InvalidRequest",
            AppError::SessionNotFound(_) => "SessionNotFound",
            AppError::InvalidChunkIndex { .. } => "InvalidChunkIndex",
            AppError::IncompleteUpload { .. } => "IncompleteUpload",
            AppError::MergeError(_) => "MergeError",
            AppError::MetadataExtraction(_) => "MetadataExtractionError",
            AppError::Thumbnail(_) => "ThumbnailError",
            AppError::FilesystemCleanup(_) => "FilesystemCleanupError",
            AppError::InvalidTransition { .. } => "InvalidTransition",
            AppError::AlreadyInFlight(_) => "AlreadyInFlight",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by up to five `Caused by:` lines from the source chain.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let causes: Vec<String> = std::iter::successors(self.source(), |err| (*err).source())
            .map(|err| err.to_string())
            .collect();

        let mut details = self.to_string();
        for cause in causes.iter().take(MAX_CAUSES) {
            details.push_str("\n  Caused by: ");
            details.push_str(cause);
        }
        if causes.len() > MAX_CAUSES {
            details.push_str("\n  ...");
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.presentation().status
    }

    fn error_code(&self) -> &'static str {
        self.presentation().code
    }

    fn is_recoverable(&self) -> bool {
        self.presentation().recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.presentation().action
    }

    fn is_sensitive(&self) -> bool {
        self.presentation().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.presentation().level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Artifact store unavailable".to_string(),
            AppError::Storage(_) => "Media storage unavailable".to_string(),
            AppError::MergeError(_) => "Failed to assemble uploaded chunks".to_string(),
            AppError::FilesystemCleanup(_) => "Failed to clean up temporary files".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::InvalidRequest(ref msg)
            | AppError::MetadataExtraction(ref msg)
            | AppError::Thumbnail(ref msg)
            | AppError::NotFound(ref msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_session_not_found() {
        let id = Uuid::new_v4();
        let err = AppError::SessionNotFound(id);
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "SESSION_NOT_FOUND");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains(&id.to_string()));
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_incomplete_upload() {
        let err = AppError::IncompleteUpload {
            received: 2,
            total: 3,
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "INCOMPLETE_UPLOAD");
        assert!(err.is_recoverable());
        assert!(err.client_message().contains("2/3"));
    }

    #[test]
    fn test_error_metadata_merge_error_hides_details() {
        let err = AppError::MergeError("missing chunk 4 at /var/tmp/x".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to assemble uploaded chunks");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_invalid_chunk_index() {
        let err = AppError::InvalidChunkIndex { index: 7, total: 3 };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_CHUNK_INDEX");
        assert_eq!(err.error_type(), "InvalidChunkIndex");
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk full").context("writing artifact"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("writing artifact"));
    }

    #[test]
    fn test_processing_errors_are_not_sensitive() {
        let err = AppError::MetadataExtraction("moov atom not found".to_string());
        assert_eq!(err.http_status_code(), 422);
        assert!(!err.is_sensitive());
        assert_eq!(err.client_message(), "moov atom not found");
        assert_eq!(err.log_level(), LogLevel::Warn);

        let err = AppError::Storage("permission denied".to_string());
        assert!(err.is_sensitive());
        assert_eq!(err.suggested_action(), RETRY_LATER);
    }
}
