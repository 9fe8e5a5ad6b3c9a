//! Data models for the ingestion pipeline
//!
//! `artifact` holds the durable media record and its processing state machine
//! vocabulary; `uploader` holds the uploader identity consumed from the
//! surrounding system and the role-gated approval decision.

mod artifact;
mod uploader;

pub use artifact::*;
pub use uploader::*;
