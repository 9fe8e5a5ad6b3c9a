//! ffmpeg-backed single-frame thumbnail generation

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::capability::ThumbnailGenerator;
use crate::command::{run_with_timeout, validate_media_path, validate_tool_path};
use crate::error::ProcessingError;

pub struct FfmpegThumbnailGenerator {
    ffmpeg_path: String,
    timeout: Duration,
}

impl FfmpegThumbnailGenerator {
    pub fn new(ffmpeg_path: String, timeout: Duration) -> Result<Self, ProcessingError> {
        validate_tool_path(&ffmpeg_path)?;
        Ok(Self {
            ffmpeg_path,
            timeout,
        })
    }
}

#[async_trait]
impl ThumbnailGenerator for FfmpegThumbnailGenerator {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "thumbnail"
    ))]
    async fn generate(
        &self,
        input: &Path,
        seek_secs: f64,
        output: &Path,
    ) -> Result<(), ProcessingError> {
        let start = std::time::Instant::now();
        validate_media_path(input)?;
        validate_media_path(output)?;

        let seek = if seek_secs.is_finite() && seek_secs > 0.0 {
            seek_secs
        } else {
            0.0
        };

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-v", "error", "-ss"])
            .arg(format!("{:.3}", seek))
            .arg("-i")
            .arg(input)
            .args(["-vframes", "1", "-q:v", "2", "-y"])
            .arg(output);

        run_with_timeout("ffmpeg", command, self.timeout).await?;

        let written = tokio::fs::metadata(output)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(ProcessingError::InvalidOutput {
                tool: "ffmpeg",
                message: "no frame was written".to_string(),
            });
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            seek_secs = seek,
            size_bytes = written,
            "Thumbnail generated"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_unsafe_path() {
        assert!(FfmpegThumbnailGenerator::new("ffmpeg && id".to_string(), Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let generator = FfmpegThumbnailGenerator::new(
            "/nonexistent/ffmpeg".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        let result = generator
            .generate(Path::new("/tmp/in.mp4"), 1.0, Path::new("/tmp/out.jpg"))
            .await;
        assert!(matches!(result, Err(ProcessingError::Spawn { .. })));
    }
}
