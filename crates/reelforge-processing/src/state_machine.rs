//! Processing state machine
//!
//! `process` drives one artifact through
//! `PENDING|FAILED -> PROCESSING -> {COMPLETED|PENDING|FAILED}`:
//! metadata extraction is fatal to the attempt, thumbnail generation is not,
//! and the settled status comes from [`decide_final_status`].

use std::sync::Arc;

use uuid::Uuid;

use reelforge_core::{
    decide_final_status, AppError, MediaArtifact, MediaType, ProcessingConfig, ProcessingOutcome,
    ProcessingStatus,
};
use reelforge_db::ArtifactRepository;
use reelforge_storage::{keys, LocalStorage};

use crate::capability::{MetadataExtractor, ThumbnailGenerator};
use crate::in_flight::InFlightSet;

/// Result of a `process_many` batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ProcessingStateMachine {
    repo: Arc<dyn ArtifactRepository>,
    storage: LocalStorage,
    extractor: Arc<dyn MetadataExtractor>,
    thumbnailer: Arc<dyn ThumbnailGenerator>,
    config: ProcessingConfig,
    in_flight: InFlightSet,
}

impl ProcessingStateMachine {
    pub fn new(
        repo: Arc<dyn ArtifactRepository>,
        storage: LocalStorage,
        extractor: Arc<dyn MetadataExtractor>,
        thumbnailer: Arc<dyn ThumbnailGenerator>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            repo,
            storage,
            extractor,
            thumbnailer,
            config,
            in_flight: InFlightSet::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    pub fn repository(&self) -> &Arc<dyn ArtifactRepository> {
        &self.repo
    }

    /// Process one artifact end to end.
    ///
    /// Returns the artifact in its settled state. A metadata failure leaves it
    /// `FAILED` and is returned as `AppError::MetadataExtraction`.
    #[tracing::instrument(skip(self))]
    pub async fn process(&self, media_id: Uuid) -> Result<MediaArtifact, AppError> {
        let _guard = self
            .in_flight
            .try_acquire(media_id)
            .ok_or(AppError::AlreadyInFlight(media_id))?;

        let artifact = self
            .repo
            .get(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media artifact {}", media_id)))?;

        if artifact.media_type != MediaType::Video {
            return Err(AppError::InvalidRequest(format!(
                "Media artifact {} is not a video",
                media_id
            )));
        }

        // Awaiting-approval rows keep their metadata; only unprocessed or failed rows are claimed.
        if !artifact
            .processing_status
            .can_transition_to(ProcessingStatus::Processing)
            || !artifact.is_processing_candidate()
        {
            return Err(AppError::InvalidTransition {
                media_id,
                from: artifact.processing_status,
            });
        }

        let artifact = match self.repo.mark_processing(media_id).await? {
            Some(artifact) => artifact,
            None => {
                let current = self
                    .repo
                    .get(media_id)
                    .await?
                    .map(|a| a.processing_status)
                    .unwrap_or(artifact.processing_status);
                return Err(AppError::InvalidTransition {
                    media_id,
                    from: current,
                });
            }
        };

        let start = std::time::Instant::now();
        tracing::info!(
            previous_status = %artifact.processing_status,
            storage_key = %artifact.storage_key,
            "Processing started"
        );

        match self.run(&artifact).await {
            Ok(outcome) => {
                let settled = self.repo.complete_processing(media_id, outcome).await;
                match settled {
                    Ok(settled) => {
                        tracing::info!(
                            status = %settled.processing_status,
                            has_thumbnail = settled.thumbnail_url.is_some(),
                            duration_ms = start.elapsed().as_millis(),
                            "Processing finished"
                        );
                        Ok(settled)
                    }
                    Err(e) => {
                        self.fail(media_id, &e.to_string()).await;
                        Err(e)
                    }
                }
            }
            Err(e) => {
                self.fail(media_id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Process every id, isolating failures.
    pub async fn process_many(&self, media_ids: &[Uuid]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for &media_id in media_ids {
            match self.process(media_id).await {
                Ok(_) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(media_id = %media_id, error = %e, "Processing failed for artifact");
                }
            }
        }

        tracing::info!(
            total = media_ids.len(),
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Batch processing finished"
        );

        outcome
    }

    /// Extraction and thumbnailing; produces everything `complete_processing` writes.
    async fn run(&self, artifact: &MediaArtifact) -> Result<ProcessingOutcome, AppError> {
        let input = self.storage.key_to_path(&artifact.storage_key)?;

        let metadata = self
            .extractor
            .extract(&input)
            .await
            .map_err(|e| AppError::MetadataExtraction(e.to_string()))?;

        let file_size = match self.storage.file_size(&artifact.storage_key).await {
            Ok(size) => i64::try_from(size).ok(),
            Err(e) => {
                tracing::warn!(media_id = %artifact.id, error = %e, "Could not read artifact size");
                None
            }
        };

        let thumbnail_url = self.generate_thumbnail(artifact, metadata.duration).await;

        Ok(ProcessingOutcome {
            duration: Some(metadata.duration),
            width: i32::try_from(metadata.width).ok(),
            height: i32::try_from(metadata.height).ok(),
            file_size,
            codec: Some(metadata.codec),
            bitrate: metadata.bitrate.and_then(|b| i64::try_from(b).ok()),
            thumbnail_url,
            final_status: decide_final_status(artifact.uploader_role),
        })
    }

    /// Best-effort thumbnail; any failure is logged and yields `None`.
    async fn generate_thumbnail(&self, artifact: &MediaArtifact, duration: f64) -> Option<String> {
        let key = keys::thumbnail_key(artifact.id);
        let (input, output) = match (
            self.storage.key_to_path(&artifact.storage_key),
            self.storage.key_to_path(&key),
        ) {
            (Ok(input), Ok(output)) => (input, output),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(media_id = %artifact.id, error = %e, "Thumbnail path rejected");
                return None;
            }
        };

        let seek = self.config.thumbnail_seek_for(duration);
        match self.thumbnailer.generate(&input, seek, &output).await {
            Ok(()) => Some(self.storage.generate_url(&key)),
            Err(e) => {
                let err = AppError::Thumbnail(e.to_string());
                tracing::warn!(media_id = %artifact.id, error = %err, "Continuing without thumbnail");
                if let Err(cleanup) = self.storage.delete(&key).await {
                    tracing::warn!(
                        media_id = %artifact.id,
                        error = %AppError::FilesystemCleanup(cleanup.to_string()),
                        "Failed to remove partial thumbnail"
                    );
                }
                None
            }
        }
    }

    async fn fail(&self, media_id: Uuid, message: &str) {
        match self.repo.mark_failed(media_id, message).await {
            Ok(_) => tracing::warn!(media_id = %media_id, error = %message, "Artifact marked FAILED"),
            Err(e) => tracing::error!(
                media_id = %media_id,
                error = %e,
                original_error = %message,
                "Failed to mark artifact FAILED"
            ),
        }
    }
}
