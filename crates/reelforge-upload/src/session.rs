//! Upload session state

use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use utoipa::ToSchema;
use uuid::Uuid;

/// Where a session keeps its chunks until merge. Fixed at initiate time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChunkResidency {
    Memory,
    Disk,
}

impl ChunkResidency {
    /// Memory for sessions declaring at most `threshold` bytes, disk otherwise.
    pub fn for_size(total_size: u64, threshold: u64) -> Self {
        if total_size <= threshold {
            ChunkResidency::Memory
        } else {
            ChunkResidency::Disk
        }
    }
}

/// A chunk spilled to the session's chunk directory.
#[derive(Debug, Clone)]
pub(crate) struct DiskChunk {
    pub(crate) path: PathBuf,
    pub(crate) len: u64,
}

/// Received chunks keyed by index; iteration order is merge order.
#[derive(Debug)]
pub(crate) enum ChunkMap {
    Memory(BTreeMap<u32, Bytes>),
    Disk(BTreeMap<u32, DiskChunk>),
}

impl ChunkMap {
    pub(crate) fn new(residency: ChunkResidency) -> Self {
        match residency {
            ChunkResidency::Memory => ChunkMap::Memory(BTreeMap::new()),
            ChunkResidency::Disk => ChunkMap::Disk(BTreeMap::new()),
        }
    }

    pub(crate) fn received_count(&self) -> u32 {
        let len = match self {
            ChunkMap::Memory(chunks) => chunks.len(),
            ChunkMap::Disk(chunks) => chunks.len(),
        };
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    /// Total bytes held, counting each index once.
    pub(crate) fn received_bytes(&self) -> u64 {
        match self {
            ChunkMap::Memory(chunks) => chunks.values().map(|b| b.len() as u64).sum(),
            ChunkMap::Disk(chunks) => chunks.values().map(|c| c.len).sum(),
        }
    }

    pub(crate) fn chunk_len(&self, index: u32) -> u64 {
        match self {
            ChunkMap::Memory(chunks) => chunks.get(&index).map_or(0, |b| b.len() as u64),
            ChunkMap::Disk(chunks) => chunks.get(&index).map_or(0, |c| c.len),
        }
    }
}

#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) chunks: ChunkMap,
    /// Set once the session has been completed, cancelled or reaped.
    /// Late chunk writes observe this and back out.
    pub(crate) closed: bool,
}

/// One in-flight chunked upload.
#[derive(Debug)]
pub struct UploadSession {
    pub upload_id: Uuid,
    /// Sanitized client filename.
    pub filename: String,
    pub mime_type: Option<String>,
    pub total_chunks: u32,
    pub total_size: u64,
    pub residency: ChunkResidency,
    pub created_at: DateTime<Utc>,
    pub(crate) chunk_dir: Option<PathBuf>,
    state: Mutex<SessionState>,
}

impl UploadSession {
    pub(crate) fn new(
        upload_id: Uuid,
        filename: String,
        mime_type: Option<String>,
        total_chunks: u32,
        total_size: u64,
        residency: ChunkResidency,
        chunk_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            upload_id,
            filename,
            mime_type,
            total_chunks,
            total_size,
            residency,
            created_at: Utc::now(),
            chunk_dir,
            state: Mutex::new(SessionState {
                chunks: ChunkMap::new(residency),
                closed: false,
            }),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    pub async fn received_count(&self) -> u32 {
        self.state.lock().await.chunks.received_count()
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        (now - self.created_at)
            .to_std()
            .map(|age| age > ttl)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Chunks still missing.
    Uploading,
    /// Every declared chunk received; ready for `complete`.
    Ready,
    /// No such session (already completed, cancelled, expired or never existed).
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub uploaded_chunks: u32,
    pub total_chunks: u32,
    /// `round(uploaded_chunks / total_chunks * 100)`, never above 100.
    pub progress: u32,
    pub status: UploadStatus,
}

impl UploadProgress {
    pub fn new(received: u32, total: u32) -> Self {
        let progress = if total == 0 {
            0
        } else {
            ((f64::from(received) / f64::from(total)) * 100.0)
                .round()
                .min(100.0) as u32
        };
        let status = if total > 0 && received >= total {
            UploadStatus::Ready
        } else {
            UploadStatus::Uploading
        };

        Self {
            uploaded_chunks: received,
            total_chunks: total,
            progress,
            status,
        }
    }

    /// Sentinel returned when polling a session that no longer exists.
    pub fn not_found() -> Self {
        Self {
            uploaded_chunks: 0,
            total_chunks: 0,
            progress: 0,
            status: UploadStatus::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residency_threshold_is_inclusive() {
        assert_eq!(ChunkResidency::for_size(100, 100), ChunkResidency::Memory);
        assert_eq!(ChunkResidency::for_size(101, 100), ChunkResidency::Disk);
    }

    #[test]
    fn test_progress_percent_rounds() {
        assert_eq!(UploadProgress::new(0, 3).progress, 0);
        assert_eq!(UploadProgress::new(1, 3).progress, 33);
        assert_eq!(UploadProgress::new(2, 3).progress, 67);
        assert_eq!(UploadProgress::new(1, 8).progress, 13);
        assert_eq!(UploadProgress::new(3, 3).progress, 100);
        assert_eq!(UploadProgress::new(3, 3).status, UploadStatus::Ready);
        assert_eq!(UploadProgress::new(2, 3).status, UploadStatus::Uploading);
    }

    #[test]
    fn test_progress_never_exceeds_100() {
        for total in 1..=50u32 {
            for received in 0..=total {
                let progress = UploadProgress::new(received, total);
                assert!(progress.progress <= 100);
                let expected = ((received as f64 / total as f64) * 100.0).round() as u32;
                assert_eq!(progress.progress, expected);
            }
        }
    }

    #[test]
    fn test_not_found_sentinel_serializes() {
        let json = serde_json::to_value(UploadProgress::not_found()).unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["uploadedChunks"], 0);
    }
}
