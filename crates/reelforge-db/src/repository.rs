//! Artifact repository abstraction

use async_trait::async_trait;
use uuid::Uuid;

use reelforge_core::{AppError, MediaArtifact, NewMediaArtifact, ProcessingOutcome};

/// Persistence contract for media artifacts.
///
/// The finalizer only calls `create`; every status change goes through the
/// processing state machine via the `mark_*` / `complete_processing` methods,
/// which are conditional on the current status so a lost race never overwrites
/// a newer state.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Insert a new artifact in `Pending` with no metadata.
    async fn create(&self, new: NewMediaArtifact) -> Result<MediaArtifact, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<MediaArtifact>, AppError>;

    /// Move an unprocessed `Pending` or a `Failed` video to `Processing`.
    ///
    /// Returns `None` when the artifact does not exist, is awaiting approval,
    /// or is in any other status.
    async fn mark_processing(&self, id: Uuid) -> Result<Option<MediaArtifact>, AppError>;

    /// Move `Processing` to `Failed`, recording the error and clearing metadata.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<MediaArtifact, AppError>;

    /// Persist metadata, thumbnail and final status of a successful run in one update.
    async fn complete_processing(
        &self,
        id: Uuid,
        outcome: ProcessingOutcome,
    ) -> Result<MediaArtifact, AppError>;

    /// Video artifacts the sweep should resubmit, oldest first, at most `limit`.
    ///
    /// Includes every `Failed` row and `Pending` rows that were never processed.
    async fn find_processing_candidates(&self, limit: i64) -> Result<Vec<MediaArtifact>, AppError>;
}

pub(crate) fn not_processing(id: Uuid) -> AppError {
    AppError::NotFound(format!("Artifact {} is not in PROCESSING state", id))
}
