use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

use super::UploaderRole;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "media_type", rename_all = "lowercase"))]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaType::Image => write!(f, "IMAGE"),
            MediaType::Video => write!(f, "VIDEO"),
        }
    }
}

/// Position of an artifact in the extraction/approval state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "processing_status", rename_all = "lowercase")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    /// Legal transitions:
    /// `Pending -> Processing`, `Failed -> Processing` (retry),
    /// `Processing -> {Completed, Failed, Pending}` (pending = awaiting approval).
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Failed, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Pending)
        )
    }
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingStatus::Pending => write!(f, "PENDING"),
            ProcessingStatus::Processing => write!(f, "PROCESSING"),
            ProcessingStatus::Completed => write!(f, "COMPLETED"),
            ProcessingStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Durable catalog record for a merged upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaArtifact {
    pub id: Uuid,
    pub url: String,
    /// Key relative to the media root (e.g. `videos/<uuid>.mp4`).
    pub storage_key: String,
    pub media_type: MediaType,
    pub uploader_id: Uuid,
    pub uploader_role: UploaderRole,
    pub original_filename: String,
    pub caption: Option<String>,
    pub parent_content_id: Option<Uuid>,
    pub processing_status: ProcessingStatus,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: Option<i64>,
    pub codec: Option<String>,
    pub bitrate: Option<i64>,
    pub thumbnail_url: Option<String>,
    pub processing_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaArtifact {
    /// Successfully processed but still waiting for manual approval.
    pub fn is_awaiting_approval(&self) -> bool {
        self.processing_status == ProcessingStatus::Pending && self.processed_at.is_some()
    }

    /// Whether the background sweep should pick this artifact up.
    pub fn is_processing_candidate(&self) -> bool {
        self.media_type == MediaType::Video
            && match self.processing_status {
                ProcessingStatus::Failed => true,
                ProcessingStatus::Pending => self.processed_at.is_none(),
                _ => false,
            }
    }
}

/// Fields supplied by the finalizer when the artifact row is created.
#[derive(Debug, Clone)]
pub struct NewMediaArtifact {
    pub id: Uuid,
    pub url: String,
    pub storage_key: String,
    pub media_type: MediaType,
    pub uploader_id: Uuid,
    pub uploader_role: UploaderRole,
    pub original_filename: String,
    pub caption: Option<String>,
    pub parent_content_id: Option<Uuid>,
}

impl NewMediaArtifact {
    /// Materialise the row as it is first persisted: `Pending`, no metadata.
    pub fn into_artifact(self, now: DateTime<Utc>) -> MediaArtifact {
        MediaArtifact {
            id: self.id,
            url: self.url,
            storage_key: self.storage_key,
            media_type: self.media_type,
            uploader_id: self.uploader_id,
            uploader_role: self.uploader_role,
            original_filename: self.original_filename,
            caption: self.caption,
            parent_content_id: self.parent_content_id,
            processing_status: ProcessingStatus::Pending,
            duration: None,
            width: None,
            height: None,
            file_size: None,
            codec: None,
            bitrate: None,
            thumbnail_url: None,
            processing_error: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Everything a successful processing run writes back in one update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOutcome {
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: Option<i64>,
    pub codec: Option<String>,
    pub bitrate: Option<i64>,
    pub thumbnail_url: Option<String>,
    pub final_status: ProcessingStatus,
}

/// Status polling view of an artifact.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatusResponse {
    pub media_id: Uuid,
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub processing_status: ProcessingStatus,
    pub awaiting_approval: bool,
    pub duration: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: Option<i64>,
    pub codec: Option<String>,
    pub bitrate: Option<i64>,
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<MediaArtifact> for ProcessingStatusResponse {
    fn from(artifact: MediaArtifact) -> Self {
        let awaiting_approval = artifact.is_awaiting_approval();
        ProcessingStatusResponse {
            media_id: artifact.id,
            url: artifact.url,
            media_type: artifact.media_type,
            processing_status: artifact.processing_status,
            awaiting_approval,
            duration: artifact.duration,
            width: artifact.width,
            height: artifact.height,
            file_size: artifact.file_size,
            codec: artifact.codec,
            bitrate: artifact.bitrate,
            thumbnail_url: artifact.thumbnail_url,
            processing_error: artifact.processing_error,
            processed_at: artifact.processed_at,
            created_at: artifact.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_artifact(role: UploaderRole) -> MediaArtifact {
        NewMediaArtifact {
            id: Uuid::new_v4(),
            url: "http://localhost/media/videos/a.mp4".to_string(),
            storage_key: "videos/a.mp4".to_string(),
            media_type: MediaType::Video,
            uploader_id: Uuid::new_v4(),
            uploader_role: role,
            original_filename: "a.mp4".to_string(),
            caption: None,
            parent_content_id: None,
        }
        .into_artifact(Utc::now())
    }

    #[test]
    fn test_status_transitions() {
        use ProcessingStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Failed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Pending));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn test_status_wire_format_is_uppercase() {
        let json = serde_json::to_string(&ProcessingStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let parsed: MediaType = serde_json::from_str("\"VIDEO\"").unwrap();
        assert_eq!(parsed, MediaType::Video);
    }

    #[test]
    fn test_new_artifact_starts_pending_without_metadata() {
        let artifact = new_artifact(UploaderRole::Author);
        assert_eq!(artifact.processing_status, ProcessingStatus::Pending);
        assert!(artifact.duration.is_none());
        assert!(artifact.thumbnail_url.is_none());
        assert!(artifact.is_processing_candidate());
        assert!(!artifact.is_awaiting_approval());
    }

    #[test]
    fn test_awaiting_approval_is_not_a_candidate() {
        let mut artifact = new_artifact(UploaderRole::Contributor);
        artifact.processed_at = Some(Utc::now());
        assert!(artifact.is_awaiting_approval());
        assert!(!artifact.is_processing_candidate());

        artifact.processing_status = ProcessingStatus::Failed;
        assert!(artifact.is_processing_candidate());
    }

    #[test]
    fn test_image_is_never_a_candidate() {
        let mut artifact = new_artifact(UploaderRole::Admin);
        artifact.media_type = MediaType::Image;
        assert!(!artifact.is_processing_candidate());
    }
}
