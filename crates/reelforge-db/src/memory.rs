//! In-process artifact repository
//!
//! Used when `DATABASE_URL` is not set and as the repository in tests.
//! Rows are lost on restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use reelforge_core::{
    AppError, MediaArtifact, NewMediaArtifact, ProcessingOutcome, ProcessingStatus,
};

use crate::repository::{not_processing, ArtifactRepository};

struct StoredArtifact {
    /// Insertion order; breaks ties between rows created in the same instant.
    seq: u64,
    artifact: MediaArtifact,
}

#[derive(Default)]
pub struct InMemoryArtifactRepository {
    rows: RwLock<HashMap<Uuid, StoredArtifact>>,
    next_seq: AtomicU64,
}

impl InMemoryArtifactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a fully formed artifact.
    pub async fn insert(&self, artifact: MediaArtifact) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.rows
            .write()
            .await
            .insert(artifact.id, StoredArtifact { seq, artifact });
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    async fn create(&self, new: NewMediaArtifact) -> Result<MediaArtifact, AppError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&new.id) {
            return Err(AppError::InvalidRequest(format!(
                "Artifact {} already exists",
                new.id
            )));
        }

        let artifact = new.into_artifact(Utc::now());
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        rows.insert(
            artifact.id,
            StoredArtifact {
                seq,
                artifact: artifact.clone(),
            },
        );
        Ok(artifact)
    }

    async fn get(&self, id: Uuid) -> Result<Option<MediaArtifact>, AppError> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id)
            .map(|stored| stored.artifact.clone()))
    }

    async fn mark_processing(&self, id: Uuid) -> Result<Option<MediaArtifact>, AppError> {
        let mut rows = self.rows.write().await;
        let Some(stored) = rows.get_mut(&id) else {
            return Ok(None);
        };

        if !stored.artifact.is_processing_candidate() {
            return Ok(None);
        }
        stored.artifact.processing_status = ProcessingStatus::Processing;
        stored.artifact.updated_at = Utc::now();
        Ok(Some(stored.artifact.clone()))
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<MediaArtifact, AppError> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .get_mut(&id)
            .filter(|s| s.artifact.processing_status == ProcessingStatus::Processing)
            .ok_or_else(|| not_processing(id))?;

        let artifact = &mut stored.artifact;
        artifact.processing_status = ProcessingStatus::Failed;
        artifact.processing_error = Some(error.to_string());
        artifact.duration = None;
        artifact.width = None;
        artifact.height = None;
        artifact.file_size = None;
        artifact.codec = None;
        artifact.bitrate = None;
        artifact.thumbnail_url = None;
        artifact.updated_at = Utc::now();
        Ok(artifact.clone())
    }

    async fn complete_processing(
        &self,
        id: Uuid,
        outcome: ProcessingOutcome,
    ) -> Result<MediaArtifact, AppError> {
        let mut rows = self.rows.write().await;
        let stored = rows
            .get_mut(&id)
            .filter(|s| s.artifact.processing_status == ProcessingStatus::Processing)
            .ok_or_else(|| not_processing(id))?;

        let now = Utc::now();
        let artifact = &mut stored.artifact;
        artifact.processing_status = outcome.final_status;
        artifact.duration = outcome.duration;
        artifact.width = outcome.width;
        artifact.height = outcome.height;
        artifact.file_size = outcome.file_size;
        artifact.codec = outcome.codec;
        artifact.bitrate = outcome.bitrate;
        artifact.thumbnail_url = outcome.thumbnail_url;
        artifact.processing_error = None;
        artifact.processed_at = Some(now);
        artifact.updated_at = now;
        Ok(artifact.clone())
    }

    async fn find_processing_candidates(&self, limit: i64) -> Result<Vec<MediaArtifact>, AppError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let rows = self.rows.read().await;

        let mut candidates: Vec<&StoredArtifact> = rows
            .values()
            .filter(|stored| stored.artifact.is_processing_candidate())
            .collect();
        candidates.sort_by_key(|stored| (stored.artifact.created_at, stored.seq));

        Ok(candidates
            .into_iter()
            .take(limit)
            .map(|stored| stored.artifact.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reelforge_core::{MediaType, UploaderRole};

    fn new_video(role: UploaderRole) -> NewMediaArtifact {
        let id = Uuid::new_v4();
        NewMediaArtifact {
            id,
            url: format!("http://localhost:3000/media/videos/{}.mp4", id),
            storage_key: format!("videos/{}.mp4", id),
            media_type: MediaType::Video,
            uploader_id: Uuid::new_v4(),
            uploader_role: role,
            original_filename: "clip.mp4".to_string(),
            caption: None,
            parent_content_id: None,
        }
    }

    fn outcome(final_status: ProcessingStatus) -> ProcessingOutcome {
        ProcessingOutcome {
            duration: Some(12.5),
            width: Some(1920),
            height: Some(1080),
            file_size: Some(4096),
            codec: Some("h264".to_string()),
            bitrate: Some(800_000),
            thumbnail_url: None,
            final_status,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryArtifactRepository::new();
        let created = repo.create(new_video(UploaderRole::Author)).await.unwrap();

        assert_eq!(created.processing_status, ProcessingStatus::Pending);
        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_processing_is_conditional() {
        let repo = InMemoryArtifactRepository::new();
        let created = repo.create(new_video(UploaderRole::Admin)).await.unwrap();

        let processing = repo.mark_processing(created.id).await.unwrap().unwrap();
        assert_eq!(processing.processing_status, ProcessingStatus::Processing);
        // already processing
        assert!(repo.mark_processing(created.id).await.unwrap().is_none());

        repo.complete_processing(created.id, outcome(ProcessingStatus::Completed))
            .await
            .unwrap();
        // completed is terminal
        assert!(repo.mark_processing(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_awaiting_approval_is_not_claimed() {
        let repo = InMemoryArtifactRepository::new();
        let created = repo.create(new_video(UploaderRole::Contributor)).await.unwrap();

        repo.mark_processing(created.id).await.unwrap().unwrap();
        let pending = repo
            .complete_processing(created.id, outcome(ProcessingStatus::Pending))
            .await
            .unwrap();
        assert!(pending.is_awaiting_approval());

        assert!(repo.mark_processing(created.id).await.unwrap().is_none());
        let stored = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(stored.processing_status, ProcessingStatus::Pending);
        assert_eq!(stored.duration, pending.duration);
    }

    #[tokio::test]
    async fn test_failed_then_retry() {
        let repo = InMemoryArtifactRepository::new();
        let created = repo.create(new_video(UploaderRole::Author)).await.unwrap();

        repo.mark_processing(created.id).await.unwrap().unwrap();
        let failed = repo.mark_failed(created.id, "ffprobe exited 1").await.unwrap();
        assert_eq!(failed.processing_status, ProcessingStatus::Failed);
        assert_eq!(failed.processing_error.as_deref(), Some("ffprobe exited 1"));
        assert!(failed.duration.is_none());

        let retried = repo.mark_processing(created.id).await.unwrap().unwrap();
        assert_eq!(retried.processing_status, ProcessingStatus::Processing);

        let done = repo
            .complete_processing(created.id, outcome(ProcessingStatus::Pending))
            .await
            .unwrap();
        assert_eq!(done.processing_status, ProcessingStatus::Pending);
        assert!(done.processing_error.is_none());
        assert!(done.processed_at.is_some());
        assert_eq!(done.codec.as_deref(), Some("h264"));
    }

    #[tokio::test]
    async fn test_complete_requires_processing() {
        let repo = InMemoryArtifactRepository::new();
        let created = repo.create(new_video(UploaderRole::Admin)).await.unwrap();

        let result = repo
            .complete_processing(created.id, outcome(ProcessingStatus::Completed))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_candidates_filters_orders_and_limits() {
        let repo = InMemoryArtifactRepository::new();
        let base = Utc::now() - Duration::hours(1);

        let mut expected = Vec::new();
        for (offset, status) in [
            (5, ProcessingStatus::Pending),
            (1, ProcessingStatus::Failed),
            (3, ProcessingStatus::Pending),
            (2, ProcessingStatus::Completed),
            (4, ProcessingStatus::Processing),
            (6, ProcessingStatus::Failed),
        ] {
            let mut artifact = new_video(UploaderRole::Author).into_artifact(base);
            artifact.created_at = base + Duration::minutes(offset);
            artifact.processing_status = status;
            if matches!(status, ProcessingStatus::Pending | ProcessingStatus::Failed) {
                expected.push((offset, artifact.id));
            }
            repo.insert(artifact).await;
        }

        // awaiting approval: processed but pending, never a candidate
        let mut approved_pending = new_video(UploaderRole::Contributor).into_artifact(base);
        approved_pending.processed_at = Some(base);
        repo.insert(approved_pending).await;

        // images are never candidates
        let mut image = new_video(UploaderRole::Author).into_artifact(base);
        image.media_type = MediaType::Image;
        repo.insert(image).await;

        expected.sort();
        let expected_ids: Vec<Uuid> = expected.iter().map(|(_, id)| *id).collect();

        let all = repo.find_processing_candidates(10).await.unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), expected_ids);
        assert!(all.iter().all(|a| matches!(
            a.processing_status,
            ProcessingStatus::Pending | ProcessingStatus::Failed
        )));

        let limited = repo.find_processing_candidates(2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(
            limited.iter().map(|a| a.id).collect::<Vec<_>>(),
            expected_ids[..2].to_vec()
        );

        assert!(repo.find_processing_candidates(0).await.unwrap().is_empty());
    }
}
