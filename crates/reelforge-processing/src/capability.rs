//! Capability interfaces for the external codec tooling

use std::path::Path;

use async_trait::async_trait;

use crate::error::ProcessingError;
use crate::metadata::VideoMetadata;

/// Reads technical metadata from a media file.
///
/// Implementations must bound their own runtime; a hung tool surfaces as
/// [`ProcessingError::Timeout`].
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, input: &Path) -> Result<VideoMetadata, ProcessingError>;
}

/// Writes a single still frame of `input`, taken `seek_secs` in, to `output`.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(
        &self,
        input: &Path,
        seek_secs: f64,
        output: &Path,
    ) -> Result<(), ProcessingError>;
}
