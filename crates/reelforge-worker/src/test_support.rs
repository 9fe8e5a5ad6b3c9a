use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use reelforge_core::{
    MediaArtifact, MediaType, NewMediaArtifact, ProcessingConfig, ProcessingStatus, UploaderRole,
};
use reelforge_db::{ArtifactRepository, InMemoryArtifactRepository};
use reelforge_processing::{
    MetadataExtractor, ProcessingError, ProcessingStateMachine, ThumbnailGenerator, VideoMetadata,
};
use reelforge_storage::{keys, LocalStorage};

/// Extractor that fails for files named after an id in `fail_for`.
#[derive(Default)]
pub(crate) struct FakeExtractor {
    pub(crate) fail_for: Mutex<HashSet<Uuid>>,
}

#[async_trait]
impl MetadataExtractor for FakeExtractor {
    async fn extract(&self, input: &Path) -> Result<VideoMetadata, ProcessingError> {
        let name = input.to_string_lossy().to_string();
        let failing = self
            .fail_for
            .lock()
            .unwrap()
            .iter()
            .any(|id| name.contains(&id.to_string()));
        if failing {
            return Err(ProcessingError::ToolFailed {
                tool: "ffprobe",
                stderr: "Invalid data found when processing input".to_string(),
            });
        }
        Ok(VideoMetadata {
            duration: 4.0,
            width: 640,
            height: 360,
            codec: "h264".to_string(),
            bitrate: Some(800_000),
        })
    }
}

pub(crate) struct FakeThumbnailer;

#[async_trait]
impl ThumbnailGenerator for FakeThumbnailer {
    async fn generate(
        &self,
        _input: &Path,
        _seek_secs: f64,
        output: &Path,
    ) -> Result<(), ProcessingError> {
        tokio::fs::write(output, b"jpeg").await.unwrap();
        Ok(())
    }
}

pub(crate) struct Harness {
    pub(crate) _dir: TempDir,
    pub(crate) storage: LocalStorage,
    pub(crate) repo: Arc<InMemoryArtifactRepository>,
    pub(crate) extractor: Arc<FakeExtractor>,
    pub(crate) machine: ProcessingStateMachine,
}

pub(crate) async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), "http://localhost:3000/media".to_string())
        .await
        .unwrap();
    let repo = Arc::new(InMemoryArtifactRepository::new());
    let extractor = Arc::new(FakeExtractor::default());
    let machine = ProcessingStateMachine::new(
        repo.clone(),
        storage.clone(),
        extractor.clone(),
        Arc::new(FakeThumbnailer),
        ProcessingConfig::default(),
    );
    Harness {
        _dir: dir,
        storage,
        repo,
        extractor,
        machine,
    }
}

/// Insert a video artifact (with its file on disk) created at `created_at`.
pub(crate) async fn seed_video(
    h: &Harness,
    role: UploaderRole,
    status: ProcessingStatus,
    created_at: DateTime<Utc>,
) -> Uuid {
    let id = Uuid::new_v4();
    let key = keys::video_key(id, "mp4");
    tokio::fs::write(h.storage.key_to_path(&key).unwrap(), vec![1u8; 256])
        .await
        .unwrap();
    let mut artifact = NewMediaArtifact {
        id,
        url: h.storage.generate_url(&key),
        storage_key: key,
        media_type: MediaType::Video,
        uploader_id: Uuid::new_v4(),
        uploader_role: role,
        original_filename: "clip.mp4".to_string(),
        caption: None,
        parent_content_id: None,
    }
    .into_artifact(created_at);
    artifact.processing_status = status;
    h.repo.insert(artifact).await;
    id
}

/// Poll until the artifact reaches `status`, failing after two seconds.
pub(crate) async fn wait_for_status(
    repo: &InMemoryArtifactRepository,
    id: Uuid,
    status: ProcessingStatus,
) -> MediaArtifact {
    for _ in 0..200 {
        if let Some(artifact) = repo.get(id).await.unwrap() {
            // PENDING is also the starting state; only count it once processed
            let settled = status == ProcessingStatus::Failed || artifact.processed_at.is_some();
            if artifact.processing_status == status && settled {
                return artifact;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("artifact {} never reached {}", id, status);
}
