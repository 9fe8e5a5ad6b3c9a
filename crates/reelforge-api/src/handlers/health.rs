//! Liveness probe

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Upload sessions currently held in the registry
    pub active_sessions: usize,
    /// Artifacts currently inside the processing state machine
    pub processing_in_flight: usize,
}

#[utoipa::path(
    get,
    path = "/api/v0/health",
    tag = "system",
    responses((status = 200, description = "Service is alive", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        active_sessions: state.upload.sessions.len(),
        processing_in_flight: state.processing.machine.in_flight().len(),
    })
}
