//! Reelforge API Library
//!
//! HTTP surface for chunked video ingestion: upload session endpoints,
//! processing status polling, application wiring and graceful shutdown.

mod api_doc;
pub mod constants;
pub mod error;
pub mod extractors;
mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
