//! Service wiring

use std::sync::Arc;

use anyhow::{Context, Result};
use reelforge_core::Config;
use reelforge_db::ArtifactRepository;
use reelforge_processing::{
    FfmpegThumbnailGenerator, FfprobeExtractor, MetadataExtractor, ProcessingStateMachine,
    ThumbnailGenerator,
};
use reelforge_storage::LocalStorage;
use reelforge_upload::{UploadFinalizer, UploadSessionStore};
use reelforge_worker::ProcessingJobQueue;

use crate::state::{AppState, ProcessingState, UploadState};

/// External media tooling used by the processing state machine.
#[derive(Clone)]
pub struct MediaProcessors {
    pub extractor: Arc<dyn MetadataExtractor>,
    pub thumbnailer: Arc<dyn ThumbnailGenerator>,
}

impl MediaProcessors {
    /// ffprobe/ffmpeg subprocess adapters from the configured paths and timeouts.
    pub fn from_config(config: &Config) -> Result<Self> {
        let processing = config.processing();
        let extractor =
            FfprobeExtractor::new(processing.ffprobe_path.clone(), processing.metadata_timeout())
                .context("Invalid FFPROBE_PATH")?;
        let thumbnailer = FfmpegThumbnailGenerator::new(
            processing.ffmpeg_path.clone(),
            processing.thumbnail_timeout(),
        )
        .context("Invalid FFMPEG_PATH")?;

        Ok(Self {
            extractor: Arc::new(extractor),
            thumbnailer: Arc::new(thumbnailer),
        })
    }
}

/// Build storage, the session store, the processing pipeline and its queue.
///
/// Must be called inside a tokio runtime; the job queue spawns its worker pool.
pub async fn initialize_services(
    config: &Config,
    repository: Arc<dyn ArtifactRepository>,
    processors: MediaProcessors,
) -> Result<Arc<AppState>> {
    let storage = LocalStorage::new(config.media_root(), config.media_base_url().to_string())
        .await
        .with_context(|| {
            format!(
                "Failed to initialize media storage at {}",
                config.media_root().display()
            )
        })?;

    let machine = ProcessingStateMachine::new(
        repository.clone(),
        storage.clone(),
        processors.extractor,
        processors.thumbnailer,
        config.processing().clone(),
    );
    let queue = ProcessingJobQueue::new(
        machine.clone(),
        config.processing().max_concurrent,
        config.processing().queue_size,
    );

    let sessions = Arc::new(UploadSessionStore::new(
        storage.clone(),
        config.upload().clone(),
    ));
    let finalizer = Arc::new(UploadFinalizer::new(
        sessions.clone(),
        repository.clone(),
        storage,
        Arc::new(queue.clone()),
    ));

    tracing::info!(
        media_root = %config.media_root().display(),
        memory_threshold_bytes = config.upload().memory_threshold_bytes,
        session_ttl_secs = config.upload().session_ttl_secs,
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        upload: UploadState {
            sessions,
            finalizer,
        },
        processing: ProcessingState {
            repository,
            machine,
            queue,
        },
    }))
}
