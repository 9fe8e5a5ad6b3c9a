//! Subprocess plumbing shared by the ffprobe and ffmpeg adapters

use std::path::{Component, Path};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use crate::error::ProcessingError;

const DANGEROUS_CHARS: [char; 11] = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];

/// Validate a configured tool path (e.g. `ffprobe`, `/usr/bin/ffmpeg`).
pub(crate) fn validate_tool_path(path: &str) -> Result<(), ProcessingError> {
    if path.is_empty() {
        return Err(ProcessingError::InvalidPath("tool path is empty".to_string()));
    }

    if path.chars().any(|c| DANGEROUS_CHARS.contains(&c)) {
        return Err(ProcessingError::InvalidPath(format!(
            "tool path contains dangerous characters: {}",
            path
        )));
    }

    if !path
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '\\' | ':'))
    {
        return Err(ProcessingError::InvalidPath(format!(
            "tool path contains unsafe characters: {}",
            path
        )));
    }

    Ok(())
}

/// Reject media paths that could escape the media root.
pub(crate) fn validate_media_path(path: &Path) -> Result<(), ProcessingError> {
    let path_str = path.to_string_lossy();
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(ProcessingError::InvalidPath(format!(
            "path contains directory traversal: {}",
            path_str
        )));
    }
    if path_str.chars().any(|c| c == '\n' || c == '\r') {
        return Err(ProcessingError::InvalidPath(format!(
            "path contains control characters: {}",
            path_str
        )));
    }
    Ok(())
}

/// Run `command` to completion, killing it if it outlives `timeout`.
pub(crate) async fn run_with_timeout(
    tool: &'static str,
    mut command: Command,
    timeout: Duration,
) -> Result<Output, ProcessingError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result.map_err(|e| ProcessingError::Spawn {
            tool,
            message: e.to_string(),
        })?,
        Err(_) => {
            return Err(ProcessingError::Timeout {
                tool,
                secs: timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ProcessingError::ToolFailed {
            tool,
            stderr: if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            },
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tool_path() {
        assert!(validate_tool_path("ffprobe").is_ok());
        assert!(validate_tool_path("/usr/local/bin/ffmpeg").is_ok());
        assert!(validate_tool_path("ffmpeg; rm -rf /").is_err());
        assert!(validate_tool_path("$(whoami)").is_err());
        assert!(validate_tool_path("").is_err());
    }

    #[test]
    fn test_validate_media_path() {
        assert!(validate_media_path(Path::new("/data/media/videos/a.mp4")).is_ok());
        assert!(validate_media_path(Path::new("/data/media/../etc/passwd")).is_err());
        assert!(validate_media_path(Path::new("/data/media/videos/take..2.mp4")).is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_timeout_reports_missing_binary() {
        let command = Command::new("/nonexistent/reelforge-tool");
        let result = run_with_timeout("ffprobe", command, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ProcessingError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_timeout_kills_slow_tool() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let result = run_with_timeout("ffmpeg", command, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(ProcessingError::Timeout { .. })));
    }
}
