//! Reelforge Upload Library
//!
//! Chunked upload sessions: the in-process [`UploadSessionStore`] that tracks
//! in-flight uploads and their chunks, and the [`UploadFinalizer`] that merges a
//! complete session into a durable artifact and hands it to processing.

pub mod finalizer;
pub mod handoff;
pub mod session;
pub mod store;

pub use finalizer::{CompletedUpload, UploadFinalizer};
pub use handoff::ProcessingHandoff;
pub use session::{ChunkResidency, UploadProgress, UploadSession, UploadStatus};
pub use store::{ChunkReceipt, InitiateUpload, UploadSessionStore};
