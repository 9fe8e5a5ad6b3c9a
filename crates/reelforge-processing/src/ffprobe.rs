//! ffprobe-backed metadata extraction

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::capability::MetadataExtractor;
use crate::command::{run_with_timeout, validate_media_path, validate_tool_path};
use crate::error::ProcessingError;
use crate::metadata::{parse_ffprobe_output, VideoMetadata};

pub struct FfprobeExtractor {
    ffprobe_path: String,
    timeout: Duration,
}

impl FfprobeExtractor {
    pub fn new(ffprobe_path: String, timeout: Duration) -> Result<Self, ProcessingError> {
        validate_tool_path(&ffprobe_path)?;
        Ok(Self {
            ffprobe_path,
            timeout,
        })
    }
}

#[async_trait]
impl MetadataExtractor for FfprobeExtractor {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn extract(&self, input: &Path) -> Result<VideoMetadata, ProcessingError> {
        let start = std::time::Instant::now();
        validate_media_path(input)?;

        let mut command = Command::new(&self.ffprobe_path);
        command
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(input);

        let output = run_with_timeout("ffprobe", command, self.timeout).await?;
        let metadata = parse_ffprobe_output(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            video_duration = metadata.duration,
            width = metadata.width,
            height = metadata.height,
            codec = %metadata.codec,
            "Video probe completed"
        );

        Ok(metadata)
    }
}
