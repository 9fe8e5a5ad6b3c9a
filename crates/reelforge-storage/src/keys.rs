//! Shared key generation for the media root.

use std::path::Path;

use uuid::Uuid;

use reelforge_core::constants::{
    DEFAULT_VIDEO_EXTENSION, THUMBNAILS_DIR, THUMBNAIL_EXTENSION, THUMBNAIL_SUFFIX, VIDEOS_DIR,
};

const MAX_EXTENSION_LEN: usize = 8;

/// Key of the merged artifact for `media_id`: `videos/{media_id}.{ext}`.
pub fn video_key(media_id: Uuid, extension: &str) -> String {
    format!("{}/{}.{}", VIDEOS_DIR, media_id, extension)
}

/// Key of the thumbnail for `media_id`: `thumbnails/{media_id}-thumb.jpg`.
pub fn thumbnail_key(media_id: Uuid) -> String {
    format!(
        "{}/{}{}.{}",
        THUMBNAILS_DIR, media_id, THUMBNAIL_SUFFIX, THUMBNAIL_EXTENSION
    )
}

/// Strip any directory components a client put in an upload filename.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('.');

    name.chars().filter(|c| !c.is_control()).collect()
}

/// Extension reused for the stored artifact.
///
/// Only short alphanumeric extensions are carried over; anything else falls back to `mp4`.
pub fn video_extension(filename: &str) -> String {
    let sanitized = sanitize_filename(filename);
    Path::new(&sanitized)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_key_layout() {
        let id = Uuid::new_v4();
        assert_eq!(video_key(id, "mov"), format!("videos/{}.mov", id));
    }

    #[test]
    fn test_thumbnail_key_layout() {
        let id = Uuid::new_v4();
        assert_eq!(thumbnail_key(id), format!("thumbnails/{}-thumb.jpg", id));
    }

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("C:\\Users\\me\\clip.mov"), "clip.mov");
        assert_eq!(sanitize_filename("  holiday.webm "), "holiday.webm");
    }

    #[test]
    fn test_video_extension_defaults() {
        assert_eq!(video_extension("clip.MOV"), "mov");
        assert_eq!(video_extension("clip"), "mp4");
        assert_eq!(video_extension("clip.$(rm)"), "mp4");
        assert_eq!(video_extension(".hidden"), "mp4");
    }
}
