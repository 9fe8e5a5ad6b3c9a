//! Upload finalizer
//!
//! Turns a complete session into a durable `VIDEO` artifact: chunks are streamed
//! into `videos/{media_id}.{ext}` strictly by index, the artifact row is created
//! in `PENDING`, processing is handed off without waiting, and the session is
//! dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use utoipa::ToSchema;
use uuid::Uuid;

use reelforge_core::{AppError, MediaType, NewMediaArtifact, UploaderContext};
use reelforge_db::ArtifactRepository;
use reelforge_storage::{keys, LocalStorage};

use crate::handoff::ProcessingHandoff;
use crate::session::{ChunkMap, UploadSession};
use crate::store::UploadSessionStore;

const MERGE_BUFFER_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletedUpload {
    pub media_id: Uuid,
    pub url: String,
}

pub struct UploadFinalizer {
    store: Arc<UploadSessionStore>,
    repo: Arc<dyn ArtifactRepository>,
    storage: LocalStorage,
    handoff: Arc<dyn ProcessingHandoff>,
}

impl UploadFinalizer {
    pub fn new(
        store: Arc<UploadSessionStore>,
        repo: Arc<dyn ArtifactRepository>,
        storage: LocalStorage,
        handoff: Arc<dyn ProcessingHandoff>,
    ) -> Self {
        Self {
            store,
            repo,
            storage,
            handoff,
        }
    }

    /// Merge, persist and hand off a complete upload.
    ///
    /// On any failure the session is left in place so the client can retry
    /// (re-sending chunks if needed) or cancel.
    #[tracing::instrument(skip_all, fields(upload_id = %upload_id, uploader_id = %uploader.uploader_id, role = %uploader.role))]
    pub async fn complete(
        &self,
        upload_id: Uuid,
        uploader: UploaderContext,
        caption: Option<String>,
        parent_content_id: Option<Uuid>,
    ) -> Result<CompletedUpload, AppError> {
        let session = self
            .store
            .get(upload_id)
            .ok_or(AppError::SessionNotFound(upload_id))?;

        // Held for the whole merge so no chunk write, cancel or reap interleaves.
        let mut state = session.lock().await;
        if state.closed {
            return Err(AppError::SessionNotFound(upload_id));
        }

        let received = state.chunks.received_count();
        if received != session.total_chunks {
            return Err(AppError::IncompleteUpload {
                received,
                total: session.total_chunks,
            });
        }

        let start = std::time::Instant::now();
        let media_id = Uuid::new_v4();
        let extension = keys::video_extension(&session.filename);
        let storage_key = keys::video_key(media_id, &extension);

        let bytes_written = match self.merge(&session, &state.chunks, &storage_key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.discard(&storage_key).await;
                return Err(e);
            }
        };

        if bytes_written != session.total_size {
            tracing::warn!(
                declared = session.total_size,
                actual = bytes_written,
                "Merged size differs from declared totalSize"
            );
        }

        let url = self.storage.generate_url(&storage_key);
        let new_artifact = NewMediaArtifact {
            id: media_id,
            url: url.clone(),
            storage_key: storage_key.clone(),
            media_type: MediaType::Video,
            uploader_id: uploader.uploader_id,
            uploader_role: uploader.role,
            original_filename: session.filename.clone(),
            caption: caption.filter(|c| !c.trim().is_empty()),
            parent_content_id,
        };

        if let Err(e) = self.repo.create(new_artifact).await {
            self.discard(&storage_key).await;
            return Err(e);
        }

        state.closed = true;
        state.chunks = ChunkMap::new(session.residency);
        drop(state);

        self.handoff.submit(media_id);
        self.store.release(&session).await;

        tracing::info!(
            media_id = %media_id,
            storage_key = %storage_key,
            size_bytes = bytes_written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload completed"
        );

        Ok(CompletedUpload { media_id, url })
    }

    /// Stream every chunk, in index order, into the artifact file.
    async fn merge(
        &self,
        session: &UploadSession,
        chunks: &ChunkMap,
        storage_key: &str,
    ) -> Result<u64, AppError> {
        let (path, file) = self
            .storage
            .create_file(storage_key)
            .await
            .map_err(|e| AppError::MergeError(e.to_string()))?;
        let mut out = BufWriter::with_capacity(MERGE_BUFFER_BYTES, file);
        let merge_err =
            |e: std::io::Error| AppError::MergeError(format!("{}: {}", path.display(), e));

        let mut written: u64 = 0;
        for index in 0..session.total_chunks {
            let missing = || AppError::MergeError(format!("chunk {} is missing", index));
            match chunks {
                ChunkMap::Memory(map) => {
                    let data = map.get(&index).ok_or_else(missing)?;
                    out.write_all(data).await.map_err(merge_err)?;
                    written += data.len() as u64;
                }
                ChunkMap::Disk(map) => {
                    let chunk = map.get(&index).ok_or_else(missing)?;
                    let mut source = fs::File::open(&chunk.path).await.map_err(|e| {
                        AppError::MergeError(format!(
                            "chunk {} unreadable at {}: {}",
                            index,
                            chunk.path.display(),
                            e
                        ))
                    })?;
                    written += tokio::io::copy(&mut source, &mut out)
                        .await
                        .map_err(merge_err)?;
                }
            }
        }

        out.flush().await.map_err(merge_err)?;
        out.into_inner().sync_all().await.map_err(merge_err)?;

        Ok(written)
    }

    async fn discard(&self, storage_key: &str) {
        if let Err(e) = self.storage.delete(storage_key).await {
            let err = AppError::FilesystemCleanup(e.to_string());
            tracing::warn!(storage_key = %storage_key, error = %err, "Failed to remove partial artifact");
        }
    }
}
