//! Application state
//!
//! Split by concern so handlers only reach for what they use.

use std::sync::Arc;

use reelforge_core::Config;
use reelforge_db::ArtifactRepository;
use reelforge_processing::ProcessingStateMachine;
use reelforge_upload::{UploadFinalizer, UploadSessionStore};
use reelforge_worker::ProcessingJobQueue;

/// Chunked upload sessions and the finalizer that turns them into artifacts.
#[derive(Clone)]
pub struct UploadState {
    pub sessions: Arc<UploadSessionStore>,
    pub finalizer: Arc<UploadFinalizer>,
}

/// Artifact persistence and the processing pipeline behind it.
#[derive(Clone)]
pub struct ProcessingState {
    pub repository: Arc<dyn ArtifactRepository>,
    pub machine: ProcessingStateMachine,
    pub queue: ProcessingJobQueue,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub upload: UploadState,
    pub processing: ProcessingState,
}
