//! Reelforge Processing Library
//!
//! Metadata extraction, thumbnail generation and the processing state machine
//! that moves a merged upload from `PENDING` to its settled status.
//!
//! The two external tools are reached only through the narrow
//! [`MetadataExtractor`] and [`ThumbnailGenerator`] traits; the ffprobe/ffmpeg
//! subprocess adapters are one implementation, test fakes are another.

pub mod capability;
mod command;
pub mod error;
pub mod ffmpeg;
pub mod ffprobe;
pub mod in_flight;
pub mod metadata;
pub mod state_machine;

pub use capability::{MetadataExtractor, ThumbnailGenerator};
pub use error::ProcessingError;
pub use ffmpeg::FfmpegThumbnailGenerator;
pub use ffprobe::FfprobeExtractor;
pub use in_flight::{InFlightGuard, InFlightSet};
pub use metadata::VideoMetadata;
pub use state_machine::{BatchOutcome, ProcessingStateMachine};
