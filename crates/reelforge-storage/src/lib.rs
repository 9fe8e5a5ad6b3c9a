//! Reelforge Storage Library
//!
//! On-disk layout for the ingestion pipeline. Everything lives under a single
//! media root:
//!
//! - `videos/{media_id}.{ext}`: merged upload artifacts
//! - `thumbnails/{media_id}-thumb.jpg`: generated thumbnails
//! - `chunks/{upload_id}/`: disk-resident chunks of in-flight upload sessions
//!
//! Keys are relative to the media root and must not contain `..` or a leading `/`.
//! Key generation is centralized in the `keys` module.

pub mod error;
pub mod keys;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::LocalStorage;
