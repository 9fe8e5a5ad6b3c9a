//! Configuration module
//!
//! Environment-driven settings for the HTTP surface, the upload session store,
//! the processing pipeline and its background jobs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::DEFAULT_SWEEP_BATCH_LIMIT;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MEMORY_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;
const SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const REAP_INTERVAL_SECS: u64 = 60 * 60;
const MAX_TOTAL_SIZE_BYTES: u64 = 10 * 1024 * 1024 * 1024;
const MAX_CHUNK_BYTES: usize = 64 * 1024 * 1024;
const MAX_CHUNKS: u32 = 10_000;
const METADATA_TIMEOUT_SECS: u64 = 60;
const THUMBNAIL_TIMEOUT_SECS: u64 = 60;
const THUMBNAIL_SEEK_SECS: f64 = 1.0;
const PROCESSING_MAX_CONCURRENT: usize = 2;
const PROCESSING_QUEUE_SIZE: usize = 1000;
const SWEEP_INTERVAL_SECS: u64 = 300;

/// Chunked upload limits and session lifetime
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Sessions declaring at most this many bytes keep their chunks in memory.
    pub memory_threshold_bytes: u64,
    pub session_ttl_secs: u64,
    /// 0 disables the scheduled reaper (initiate still reaps opportunistically).
    pub reap_interval_secs: u64,
    pub max_total_size_bytes: u64,
    pub max_chunk_bytes: usize,
    pub max_chunks: u32,
}

/// External tooling and worker settings for metadata/thumbnail processing
#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub metadata_timeout_secs: u64,
    pub thumbnail_timeout_secs: u64,
    pub thumbnail_seek_secs: f64,
    pub max_concurrent: usize,
    pub queue_size: usize,
    pub sweep_enabled: bool,
    pub sweep_interval_secs: u64,
    pub sweep_batch_limit: i64,
}

#[derive(Clone, Debug)]
pub struct ReelforgeConfig {
    pub server_port: u16,
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub media_root: PathBuf,
    pub media_base_url: String,
    pub max_body_bytes: usize,
    pub upload: UploadConfig,
    pub processing: ProcessingConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ReelforgeConfig>);

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            memory_threshold_bytes: MEMORY_THRESHOLD_BYTES,
            session_ttl_secs: SESSION_TTL_SECS,
            reap_interval_secs: REAP_INTERVAL_SECS,
            max_total_size_bytes: MAX_TOTAL_SIZE_BYTES,
            max_chunk_bytes: MAX_CHUNK_BYTES,
            max_chunks: MAX_CHUNKS,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            metadata_timeout_secs: METADATA_TIMEOUT_SECS,
            thumbnail_timeout_secs: THUMBNAIL_TIMEOUT_SECS,
            thumbnail_seek_secs: THUMBNAIL_SEEK_SECS,
            max_concurrent: PROCESSING_MAX_CONCURRENT,
            queue_size: PROCESSING_QUEUE_SIZE,
            sweep_enabled: true,
            sweep_interval_secs: SWEEP_INTERVAL_SECS,
            sweep_batch_limit: DEFAULT_SWEEP_BATCH_LIMIT,
        }
    }
}

impl Default for ReelforgeConfig {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            media_root: PathBuf::from("./data/media"),
            media_base_url: format!("http://localhost:{}/media", SERVER_PORT),
            max_body_bytes: MAX_CHUNK_BYTES + 1024 * 1024,
            upload: UploadConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|value| value.trim().to_lowercase())
        .ok()
        .and_then(|value| match value.as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

impl ReelforgeConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let server_port = env_or("SERVER_PORT", defaults.server_port);
        let max_chunk_bytes = env_or("UPLOAD_MAX_CHUNK_BYTES", defaults.upload.max_chunk_bytes);

        let config = Self {
            server_port,
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or(defaults.environment),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", defaults.db_timeout_seconds),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            media_base_url: env::var("MEDIA_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/media", server_port)),
            max_body_bytes: env_or("MAX_BODY_BYTES", max_chunk_bytes + 1024 * 1024),
            upload: UploadConfig {
                memory_threshold_bytes: env_or(
                    "UPLOAD_MEMORY_THRESHOLD_BYTES",
                    defaults.upload.memory_threshold_bytes,
                ),
                session_ttl_secs: env_or("UPLOAD_SESSION_TTL_SECS", defaults.upload.session_ttl_secs),
                reap_interval_secs: env_or(
                    "UPLOAD_REAP_INTERVAL_SECS",
                    defaults.upload.reap_interval_secs,
                ),
                max_total_size_bytes: env_or(
                    "UPLOAD_MAX_TOTAL_SIZE_BYTES",
                    defaults.upload.max_total_size_bytes,
                ),
                max_chunk_bytes,
                max_chunks: env_or("UPLOAD_MAX_CHUNKS", defaults.upload.max_chunks),
            },
            processing: ProcessingConfig {
                ffprobe_path: env::var("FFPROBE_PATH")
                    .unwrap_or(defaults.processing.ffprobe_path),
                ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(defaults.processing.ffmpeg_path),
                metadata_timeout_secs: env_or(
                    "METADATA_TIMEOUT_SECS",
                    defaults.processing.metadata_timeout_secs,
                ),
                thumbnail_timeout_secs: env_or(
                    "THUMBNAIL_TIMEOUT_SECS",
                    defaults.processing.thumbnail_timeout_secs,
                ),
                thumbnail_seek_secs: env_or(
                    "THUMBNAIL_SEEK_SECS",
                    defaults.processing.thumbnail_seek_secs,
                ),
                max_concurrent: env_or(
                    "PROCESSING_MAX_CONCURRENT",
                    defaults.processing.max_concurrent,
                ),
                queue_size: env_or("PROCESSING_QUEUE_SIZE", defaults.processing.queue_size),
                sweep_enabled: env_flag("SWEEP_ENABLED", defaults.processing.sweep_enabled),
                sweep_interval_secs: env_or(
                    "SWEEP_INTERVAL_SECS",
                    defaults.processing.sweep_interval_secs,
                ),
                sweep_batch_limit: env_or(
                    "SWEEP_BATCH_LIMIT",
                    defaults.processing.sweep_batch_limit,
                ),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgresql://") || url.starts_with("postgres://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.media_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("MEDIA_BASE_URL must not be empty"));
        }

        if self.upload.max_chunks == 0 {
            return Err(anyhow::anyhow!("UPLOAD_MAX_CHUNKS must be greater than 0"));
        }

        if self.upload.max_chunk_bytes == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_MAX_CHUNK_BYTES must be greater than 0"
            ));
        }

        if self.upload.max_total_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_MAX_TOTAL_SIZE_BYTES must be greater than 0"
            ));
        }

        if self.upload.session_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_SESSION_TTL_SECS must be greater than 0"
            ));
        }

        if !self.processing.thumbnail_seek_secs.is_finite()
            || self.processing.thumbnail_seek_secs < 0.0
        {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_SEEK_SECS must be a non-negative number"
            ));
        }

        if self.processing.max_concurrent == 0 || self.processing.queue_size == 0 {
            return Err(anyhow::anyhow!(
                "PROCESSING_MAX_CONCURRENT and PROCESSING_QUEUE_SIZE must be greater than 0"
            ));
        }

        if self.processing.sweep_batch_limit <= 0 {
            return Err(anyhow::anyhow!("SWEEP_BATCH_LIMIT must be greater than 0"));
        }

        if self.processing.sweep_enabled && self.processing.sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "SWEEP_INTERVAL_SECS must be greater than 0 when the sweep is enabled"
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config(Box::default())
    }
}

impl Config {
    fn inner(&self) -> &ReelforgeConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ReelforgeConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().db_timeout_seconds)
    }

    pub fn media_root(&self) -> &std::path::Path {
        &self.inner().media_root
    }

    pub fn media_base_url(&self) -> &str {
        &self.inner().media_base_url
    }

    pub fn max_body_bytes(&self) -> usize {
        self.inner().max_body_bytes
    }

    pub fn upload(&self) -> &UploadConfig {
        &self.inner().upload
    }

    pub fn processing(&self) -> &ProcessingConfig {
        &self.inner().processing
    }
}

impl UploadConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl ProcessingConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn thumbnail_timeout(&self) -> Duration {
        Duration::from_secs(self.thumbnail_timeout_secs)
    }

    /// Seek offset for the thumbnail frame, clamped to the middle of short clips.
    pub fn thumbnail_seek_for(&self, duration_secs: f64) -> f64 {
        if duration_secs.is_finite() && duration_secs > 0.0 {
            self.thumbnail_seek_secs.min(duration_secs / 2.0)
        } else {
            0.0
        }
    }
}
