//! Shared constants

/// Directory (relative to the media root) holding merged video artifacts.
pub const VIDEOS_DIR: &str = "videos";

/// Directory (relative to the media root) holding generated thumbnails.
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// Directory (relative to the media root) holding disk-resident upload chunks.
pub const CHUNKS_DIR: &str = "chunks";

/// Suffix appended to the media id when naming a thumbnail.
pub const THUMBNAIL_SUFFIX: &str = "-thumb";

/// Extension used for thumbnails written by the frame extractor.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

/// Extension used for merged artifacts when the original filename has none.
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// Default number of candidates a single sweep run may resubmit.
pub const DEFAULT_SWEEP_BATCH_LIMIT: i64 = 5;
