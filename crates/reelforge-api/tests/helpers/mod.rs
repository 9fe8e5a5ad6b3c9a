//! Test helpers: build AppState and router for integration tests.
//!
//! The real router and services run against an in-memory artifact repository,
//! a temporary media root and fake media tooling, so no database, ffprobe or
//! ffmpeg is required.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use reelforge_api::constants;
use reelforge_api::setup::routes;
use reelforge_api::setup::services::{initialize_services, MediaProcessors};
use reelforge_api::AppState;
use reelforge_core::{Config, ReelforgeConfig, UploadConfig};
use reelforge_db::InMemoryArtifactRepository;
use reelforge_processing::{MetadataExtractor, ProcessingError, ThumbnailGenerator, VideoMetadata};
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

/// Reports a fixed 10s 1280x720 h264 stream for every input.
pub struct FakeExtractor;

#[async_trait]
impl MetadataExtractor for FakeExtractor {
    async fn extract(&self, _input: &Path) -> Result<VideoMetadata, ProcessingError> {
        Ok(VideoMetadata {
            duration: 10.0,
            width: 1280,
            height: 720,
            codec: "h264".to_string(),
            bitrate: Some(1_200_000),
        })
    }
}

pub struct FakeThumbnailer;

#[async_trait]
impl ThumbnailGenerator for FakeThumbnailer {
    async fn generate(
        &self,
        _input: &Path,
        _seek_secs: f64,
        output: &Path,
    ) -> Result<(), ProcessingError> {
        tokio::fs::write(output, b"\xff\xd8\xff\xe0jpeg")
            .await
            .map_err(|e| ProcessingError::InvalidOutput {
                tool: "ffmpeg",
                message: e.to_string(),
            })
    }
}

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn media_root(&self) -> PathBuf {
        self._temp_dir.path().to_path_buf()
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(UploadConfig::default()).await
}

pub async fn setup_test_app_with(upload: UploadConfig) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = Config(Box::new(ReelforgeConfig {
        media_root: temp_dir.path().to_path_buf(),
        media_base_url: "http://localhost:3000/media".to_string(),
        upload,
        ..ReelforgeConfig::default()
    }));

    let processors = MediaProcessors {
        extractor: Arc::new(FakeExtractor),
        thumbnailer: Arc::new(FakeThumbnailer),
    };
    let state = initialize_services(
        &config,
        Arc::new(InMemoryArtifactRepository::new()),
        processors,
    )
    .await
    .expect("Failed to initialize services");

    let app = routes::setup_routes(&config, state.clone());
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

pub struct Uploader {
    pub id: Uuid,
    pub role: &'static str,
}

impl Uploader {
    pub fn new(role: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
        }
    }
}

/// Initiate an upload and return its id.
pub async fn initiate(client: &TestServer, filename: &str, total_chunks: usize, total_size: usize) -> Uuid {
    let response = client
        .post(&api_path("/uploads/chunked/initiate"))
        .json(&serde_json::json!({
            "filename": filename,
            "totalChunks": total_chunks,
            "totalSize": total_size,
            "mimeType": "video/mp4",
        }))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body: Value = response.json();
    body["uploadId"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("uploadId in response")
}

pub async fn put_chunk(client: &TestServer, upload_id: Uuid, index: usize, data: &[u8]) -> Value {
    let response = client
        .put(&api_path(&format!(
            "/uploads/chunked/{}/chunks/{}",
            upload_id, index
        )))
        .bytes(data.to_vec().into())
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    response.json()
}

pub async fn complete(
    client: &TestServer,
    upload_id: Uuid,
    uploader: &Uploader,
    body: Value,
) -> axum_test::TestResponse {
    client
        .post(&api_path(&format!("/uploads/chunked/{}/complete", upload_id)))
        .add_header("X-Uploader-Id", uploader.id.to_string())
        .add_header("X-Uploader-Role", uploader.role)
        .json(&body)
        .await
}

/// Poll the processing status until `processedAt` or a FAILED status shows up.
pub async fn wait_until_processed(client: &TestServer, media_id: &str) -> Value {
    for _ in 0..200 {
        let response = client
            .get(&api_path(&format!("/media/{}/processing", media_id)))
            .await;
        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        if !body["processedAt"].is_null() || body["processingStatus"] == "FAILED" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("media {} was never processed", media_id);
}

/// Deterministic, non-repeating test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
