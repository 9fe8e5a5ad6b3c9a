//! Upload session store
//!
//! Registry of in-flight chunked uploads. The map itself is a `DashMap` so
//! sessions for different uploads never contend; each session carries its own
//! mutex so concurrent chunks for the same upload serialize on that session only.
//! Map entries are cloned out as `Arc`s and never held across an await.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use utoipa::ToSchema;
use uuid::Uuid;

use reelforge_core::{AppError, UploadConfig};
use reelforge_storage::{keys, LocalStorage};

use crate::session::{ChunkMap, ChunkResidency, DiskChunk, UploadProgress, UploadSession};

/// Parameters of a new chunked upload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUpload {
    pub filename: String,
    pub total_chunks: i64,
    pub total_size: i64,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Acknowledgement of a stored chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChunkReceipt {
    pub received: u32,
    pub total: u32,
}

pub struct UploadSessionStore {
    sessions: DashMap<Uuid, Arc<UploadSession>>,
    storage: LocalStorage,
    config: UploadConfig,
}

impl UploadSessionStore {
    pub fn new(storage: LocalStorage, config: UploadConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            storage,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, upload_id: Uuid) -> Option<Arc<UploadSession>> {
        self.sessions
            .get(&upload_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Open a new session. Expired sessions are reaped first.
    #[tracing::instrument(skip(self, request), fields(filename = %request.filename, total_chunks = request.total_chunks, total_size = request.total_size))]
    pub async fn initiate(&self, request: InitiateUpload) -> Result<Arc<UploadSession>, AppError> {
        let reaped = self.reap_expired().await;
        if reaped > 0 {
            tracing::info!(reaped, "Reaped expired upload sessions during initiate");
        }

        let (filename, total_chunks, total_size) = self.validate_initiate(&request)?;

        let upload_id = Uuid::new_v4();
        let residency = ChunkResidency::for_size(total_size, self.config.memory_threshold_bytes);
        let chunk_dir = match residency {
            ChunkResidency::Memory => None,
            ChunkResidency::Disk => Some(self.storage.create_chunk_dir(upload_id).await?),
        };

        let session = Arc::new(UploadSession::new(
            upload_id,
            filename,
            request.mime_type.filter(|m| !m.trim().is_empty()),
            total_chunks,
            total_size,
            residency,
            chunk_dir,
        ));
        self.sessions.insert(upload_id, Arc::clone(&session));

        tracing::info!(
            upload_id = %upload_id,
            residency = ?residency,
            active_sessions = self.sessions.len(),
            "Upload session initiated"
        );

        Ok(session)
    }

    fn validate_initiate(&self, request: &InitiateUpload) -> Result<(String, u32, u64), AppError> {
        let filename = keys::sanitize_filename(&request.filename);
        if filename.is_empty() {
            return Err(AppError::InvalidRequest(
                "filename must not be empty".to_string(),
            ));
        }

        if request.total_chunks <= 0 {
            return Err(AppError::InvalidRequest(
                "totalChunks must be greater than 0".to_string(),
            ));
        }
        if request.total_size <= 0 {
            return Err(AppError::InvalidRequest(
                "totalSize must be greater than 0".to_string(),
            ));
        }

        let total_chunks = u32::try_from(request.total_chunks)
            .ok()
            .filter(|n| *n <= self.config.max_chunks)
            .ok_or_else(|| {
                AppError::InvalidRequest(format!(
                    "totalChunks must not exceed {}",
                    self.config.max_chunks
                ))
            })?;

        let total_size = u64::try_from(request.total_size)
            .ok()
            .filter(|n| *n <= self.config.max_total_size_bytes)
            .ok_or_else(|| {
                AppError::InvalidRequest(format!(
                    "totalSize must not exceed {} bytes",
                    self.config.max_total_size_bytes
                ))
            })?;

        if u64::from(total_chunks) > total_size {
            return Err(AppError::InvalidRequest(
                "totalChunks must not exceed totalSize".to_string(),
            ));
        }

        Ok((filename, total_chunks, total_size))
    }

    /// Store one chunk. Re-sending an index replaces the earlier bytes.
    #[tracing::instrument(skip(self, data), fields(upload_id = %upload_id, chunk_index = index, size_bytes = data.len()))]
    pub async fn record_chunk(
        &self,
        upload_id: Uuid,
        index: u32,
        data: Bytes,
    ) -> Result<ChunkReceipt, AppError> {
        let session = self
            .get(upload_id)
            .ok_or(AppError::SessionNotFound(upload_id))?;

        if index >= session.total_chunks {
            return Err(AppError::InvalidChunkIndex {
                index,
                total: session.total_chunks,
            });
        }
        if data.is_empty() {
            return Err(AppError::InvalidRequest("chunk must not be empty".to_string()));
        }
        if data.len() > self.config.max_chunk_bytes {
            return Err(AppError::InvalidRequest(format!(
                "chunk exceeds {} bytes",
                self.config.max_chunk_bytes
            )));
        }

        let received = match session.residency {
            ChunkResidency::Memory => self.store_in_memory(&session, index, data).await?,
            ChunkResidency::Disk => self.store_on_disk(&session, index, data).await?,
        };

        tracing::debug!(
            received,
            total = session.total_chunks,
            "Chunk stored"
        );

        Ok(ChunkReceipt {
            received,
            total: session.total_chunks,
        })
    }

    async fn store_in_memory(
        &self,
        session: &UploadSession,
        index: u32,
        data: Bytes,
    ) -> Result<u32, AppError> {
        let mut state = session.lock().await;
        if state.closed {
            return Err(AppError::SessionNotFound(session.upload_id));
        }
        check_declared_size(session, &state.chunks, index, data.len() as u64)?;

        if let ChunkMap::Memory(chunks) = &mut state.chunks {
            chunks.insert(index, data);
        }
        Ok(state.chunks.received_count())
    }

    async fn store_on_disk(
        &self,
        session: &UploadSession,
        index: u32,
        data: Bytes,
    ) -> Result<u32, AppError> {
        let chunk_dir = session
            .chunk_dir
            .clone()
            .unwrap_or_else(|| self.storage.chunk_dir(session.upload_id));
        let len = data.len() as u64;
        let final_path = chunk_dir.join(format!("{}.part", index));
        let temp_path = chunk_dir.join(format!("{}.part.{}.tmp", index, Uuid::new_v4()));

        // Write outside the lock so large chunks for the same session can land in parallel.
        if let Err(e) = fs::write(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            if session.lock().await.closed {
                return Err(AppError::SessionNotFound(session.upload_id));
            }
            return Err(AppError::Storage(format!(
                "Failed to write chunk {} to {}: {}",
                index,
                temp_path.display(),
                e
            )));
        }

        let mut state = session.lock().await;
        if state.closed {
            drop(state);
            let _ = fs::remove_file(&temp_path).await;
            return Err(AppError::SessionNotFound(session.upload_id));
        }
        if let Err(e) = check_declared_size(session, &state.chunks, index, len) {
            drop(state);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            drop(state);
            let _ = fs::remove_file(&temp_path).await;
            return Err(AppError::Storage(format!(
                "Failed to move chunk {} into place: {}",
                index, e
            )));
        }

        if let ChunkMap::Disk(chunks) = &mut state.chunks {
            chunks.insert(
                index,
                DiskChunk {
                    path: final_path,
                    len,
                },
            );
        }
        Ok(state.chunks.received_count())
    }

    /// Progress of a session, or `None` if it does not exist.
    pub async fn progress(&self, upload_id: Uuid) -> Option<UploadProgress> {
        let session = self.get(upload_id)?;
        let state = session.lock().await;
        if state.closed {
            return None;
        }
        Some(UploadProgress::new(
            state.chunks.received_count(),
            session.total_chunks,
        ))
    }

    /// Drop a session and its chunk files.
    #[tracing::instrument(skip(self), fields(upload_id = %upload_id))]
    pub async fn cancel(&self, upload_id: Uuid) -> Result<(), AppError> {
        self.evict(upload_id).await?;
        tracing::info!("Upload session cancelled");
        Ok(())
    }

    /// Cancel every session older than the configured TTL.
    pub async fn reap_expired(&self) -> usize {
        self.reap_expired_at(Utc::now()).await
    }

    pub async fn reap_expired_at(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.config.session_ttl();

        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(now, ttl))
            .map(|entry| *entry.key())
            .collect();

        let mut reaped = 0;
        for upload_id in expired {
            match self.evict(upload_id).await {
                Ok(()) => {
                    reaped += 1;
                    tracing::info!(upload_id = %upload_id, "Expired upload session reaped");
                }
                // completed or cancelled while we were iterating
                Err(AppError::SessionNotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(upload_id = %upload_id, error = %e, "Failed to reap upload session")
                }
            }
        }
        reaped
    }

    async fn evict(&self, upload_id: Uuid) -> Result<(), AppError> {
        let (_, session) = self
            .sessions
            .remove(&upload_id)
            .ok_or(AppError::SessionNotFound(upload_id))?;

        {
            let mut state = session.lock().await;
            if state.closed {
                return Err(AppError::SessionNotFound(upload_id));
            }
            state.closed = true;
            state.chunks = ChunkMap::new(session.residency);
        }

        self.cleanup_chunks(&session).await;
        Ok(())
    }

    /// Forget a session that the finalizer has already closed.
    pub(crate) async fn release(&self, session: &UploadSession) {
        self.sessions.remove(&session.upload_id);
        self.cleanup_chunks(session).await;
    }

    /// Best-effort removal of disk-resident chunks; failures are only logged.
    async fn cleanup_chunks(&self, session: &UploadSession) {
        if session.residency != ChunkResidency::Disk {
            return;
        }
        if let Err(e) = self.storage.remove_chunk_dir(session.upload_id).await {
            let err = AppError::FilesystemCleanup(e.to_string());
            tracing::warn!(upload_id = %session.upload_id, error = %err, "Chunk cleanup failed");
        }
    }
}

fn check_declared_size(
    session: &UploadSession,
    chunks: &ChunkMap,
    index: u32,
    len: u64,
) -> Result<(), AppError> {
    let after = chunks.received_bytes() - chunks.chunk_len(index) + len;
    if after > session.total_size {
        return Err(AppError::InvalidRequest(format!(
            "chunk data ({} bytes) exceeds declared totalSize ({} bytes)",
            after, session.total_size
        )));
    }
    Ok(())
}
