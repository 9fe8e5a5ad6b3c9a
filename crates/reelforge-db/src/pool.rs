//! Postgres pool for the artifact repository

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Open the pool and bring the `media_artifacts` schema up to date.
///
/// Migrations are embedded from the workspace `migrations/` directory at build time.
pub async fn setup_database(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .connect(database_url)
        .await
        .context("Failed to connect to artifact database")?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to apply artifact migrations")?;

    tracing::info!(max_connections, "Artifact database ready");
    Ok(pool)
}
