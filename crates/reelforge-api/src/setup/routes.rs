//! Route configuration

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::{delete, get, post, put},
    Json, Router,
};
use reelforge_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{
    API_PREFIX, DEFAULT_HTTP_CONCURRENCY_LIMIT, OPENAPI_JSON_PATH, UPLOADER_ID_HEADER,
    UPLOADER_ROLE_HEADER,
};
use crate::handlers;
use crate::state::AppState;

fn upload_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            &format!("{}/uploads/chunked/initiate", API_PREFIX),
            post(handlers::chunked_upload::initiate_upload),
        )
        .route(
            &format!("{}/uploads/chunked/{{upload_id}}/chunks/{{chunk_index}}", API_PREFIX),
            put(handlers::chunked_upload::upload_chunk),
        )
        .route(
            &format!("{}/uploads/chunked/{{upload_id}}/complete", API_PREFIX),
            post(handlers::chunked_upload::complete_upload),
        )
        .route(
            &format!("{}/uploads/chunked/{{upload_id}}/progress", API_PREFIX),
            get(handlers::chunked_upload::upload_progress),
        )
        .route(
            &format!("{}/uploads/chunked/{{upload_id}}", API_PREFIX),
            delete(handlers::chunked_upload::cancel_upload),
        )
        .with_state(state)
}

fn media_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            &format!("{}/media/{{media_id}}/processing", API_PREFIX),
            get(handlers::media_status::get_processing_status),
        )
        .with_state(state)
}

fn system_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            &format!("{}/health", API_PREFIX),
            get(handlers::health::health_check),
        )
        .route(
            OPENAPI_JSON_PATH,
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .with_state(state)
}

fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(UPLOADER_ID_HEADER),
            HeaderName::from_static(UPLOADER_ROLE_HEADER),
        ])
}

/// Setup all application routes and middleware.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let max_body_bytes = config.max_body_bytes();
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_HTTP_CONCURRENCY_LIMIT)
        .max(1);
    tracing::debug!(
        max_body_bytes,
        http_concurrency_limit,
        "Request limits configured"
    );

    Router::new()
        .merge(system_routes(state.clone()))
        .merge(upload_routes(state.clone()))
        .merge(media_routes(state))
        // Chunk bodies are raw bytes; replace axum's 2 MB default with the configured cap.
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
}
