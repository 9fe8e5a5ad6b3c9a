//! Video metadata and ffprobe output parsing

use serde::{Deserialize, Serialize};

use crate::error::ProcessingError;

/// Video metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub bitrate: Option<u64>,
}

fn invalid(message: &str) -> ProcessingError {
    ProcessingError::InvalidOutput {
        tool: "ffprobe",
        message: message.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(value: &serde_json::Value) -> Option<T> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

/// Parse `ffprobe -print_format json -show_format -show_streams -select_streams v:0` output.
pub fn parse_ffprobe_output(stdout: &[u8]) -> Result<VideoMetadata, ProcessingError> {
    let probe_data: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| invalid(&format!("not valid JSON: {}", e)))?;

    let stream = probe_data["streams"]
        .get(0)
        .ok_or_else(|| invalid("no video stream found"))?;
    let format = &probe_data["format"];

    let duration = parse_number::<f64>(&format["duration"])
        .or_else(|| parse_number::<f64>(&stream["duration"]))
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| invalid("could not parse duration"))?;

    let width = stream["width"]
        .as_u64()
        .and_then(|w| u32::try_from(w).ok())
        .ok_or_else(|| invalid("could not parse width"))?;

    let height = stream["height"]
        .as_u64()
        .and_then(|h| u32::try_from(h).ok())
        .ok_or_else(|| invalid("could not parse height"))?;

    let codec = stream["codec_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    let bitrate = parse_number::<u64>(&format["bit_rate"])
        .or_else(|| parse_number::<u64>(&stream["bit_rate"]));

    Ok(VideoMetadata {
        duration,
        width,
        height,
        codec,
        bitrate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ffprobe_output() {
        let stdout = br#"{
            "streams": [{"codec_name": "h264", "width": 1280, "height": 720, "r_frame_rate": "30/1"}],
            "format": {"duration": "12.345000", "bit_rate": "1500000", "format_name": "mov,mp4"}
        }"#;

        let metadata = parse_ffprobe_output(stdout).unwrap();
        assert_eq!(metadata.width, 1280);
        assert_eq!(metadata.height, 720);
        assert_eq!(metadata.codec, "h264");
        assert_eq!(metadata.bitrate, Some(1_500_000));
        assert!((metadata.duration - 12.345).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_falls_back_to_stream_fields() {
        let stdout = br#"{
            "streams": [{"width": 640, "height": 360, "duration": "3.0", "bit_rate": "64000"}],
            "format": {}
        }"#;

        let metadata = parse_ffprobe_output(stdout).unwrap();
        assert_eq!(metadata.codec, "unknown");
        assert_eq!(metadata.duration, 3.0);
        assert_eq!(metadata.bitrate, Some(64_000));
    }

    #[test]
    fn test_parse_rejects_missing_stream() {
        let result = parse_ffprobe_output(br#"{"streams": [], "format": {"duration": "1.0"}}"#);
        assert!(matches!(result, Err(ProcessingError::InvalidOutput { .. })));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_ffprobe_output(b"not json").is_err());
        assert!(parse_ffprobe_output(br#"{"streams": [{"width": 1}], "format": {"duration": "1"}}"#).is_err());
    }
}
