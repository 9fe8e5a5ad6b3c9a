//! Application setup and initialization

pub mod database;
pub mod jobs;
pub mod routes;
pub mod server;
pub mod services;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use reelforge_core::Config;

use crate::state::AppState;
use jobs::BackgroundJobs;
use services::MediaProcessors;

/// A fully wired application: shared state, router and running background jobs.
pub struct App {
    pub state: Arc<AppState>,
    pub router: Router,
    pub jobs: BackgroundJobs,
}

/// Initialize the entire application from configuration.
pub async fn initialize_app(config: Config) -> Result<App> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry().context("Failed to initialize telemetry")?;
    tracing::info!(environment = %config.environment(), "Configuration loaded and validated");

    let repository = database::setup_repository(&config).await?;
    let processors = MediaProcessors::from_config(&config)?;
    let state = services::initialize_services(&config, repository, processors).await?;

    let router = routes::setup_routes(&config, state.clone());
    let jobs = BackgroundJobs::start(&config, &state);

    Ok(App {
        state,
        router,
        jobs,
    })
}
