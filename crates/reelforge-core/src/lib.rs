//! Reelforge Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every reelforge component: the upload session store, the processing state
//! machine, the background jobs and the HTTP surface.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, ProcessingConfig, ReelforgeConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    decide_final_status, MediaArtifact, MediaType, NewMediaArtifact, ProcessingOutcome,
    ProcessingStatus, ProcessingStatusResponse, UploaderContext, UploaderRole,
};
