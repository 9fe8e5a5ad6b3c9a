use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use reelforge_core::constants::{CHUNKS_DIR, THUMBNAILS_DIR, VIDEOS_DIR};

use crate::error::{StorageError, StorageResult};

/// Local filesystem storage for merged artifacts, thumbnails and chunk spill files
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Media root (e.g., "/var/lib/reelforge/media")
    /// * `base_url` - Base URL the media root is served from (e.g., "http://localhost:3000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        for dir in [VIDEOS_DIR, THUMBNAILS_DIR, CHUNKS_DIR] {
            let path = base_path.join(dir);
            fs::create_dir_all(&path).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        // Resolved once so every path handed to ffprobe/ffmpeg is free of `..` and symlinked roots.
        let base_path = fs::canonicalize(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to resolve storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    pub fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        if let (Ok(canonical), Ok(base_canonical)) =
            (path.canonicalize(), self.base_path.canonicalize())
        {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Generate public URL for a key
    pub fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Directory holding the disk-resident chunks of one upload session.
    pub fn chunk_dir(&self, upload_id: Uuid) -> PathBuf {
        self.base_path.join(CHUNKS_DIR).join(upload_id.to_string())
    }

    pub async fn create_chunk_dir(&self, upload_id: Uuid) -> StorageResult<PathBuf> {
        let dir = self.chunk_dir(upload_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create chunk directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(dir)
    }

    /// Create (or truncate) the file behind `key`, creating parent directories as needed.
    pub async fn create_file(&self, key: &str) -> StorageResult<(PathBuf, fs::File)> {
        let path = self.key_to_path(key)?;
        self.ensure_parent_dir(&path).await?;

        let file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        Ok((path, file))
    }

    /// Size in bytes of the file behind `key`.
    pub async fn file_size(&self, key: &str) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    /// Delete the file behind `key`. Deleting a missing file is not an error.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    /// Remove a session's chunk directory and everything in it. Missing directories are ignored.
    pub async fn remove_chunk_dir(&self, upload_id: Uuid) -> StorageResult<()> {
        let dir = self.chunk_dir(upload_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(upload_id = %upload_id, path = %dir.display(), "Removed chunk directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to remove chunk directory {}: {}",
                dir.display(),
                e
            ))),
        }
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
