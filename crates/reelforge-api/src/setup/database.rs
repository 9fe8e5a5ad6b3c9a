//! Artifact repository selection

use std::sync::Arc;

use anyhow::Result;
use reelforge_core::Config;
use reelforge_db::{setup_database, ArtifactRepository, InMemoryArtifactRepository, PgArtifactRepository};

/// Postgres when `DATABASE_URL` is set, otherwise a process-local in-memory store.
pub async fn setup_repository(config: &Config) -> Result<Arc<dyn ArtifactRepository>> {
    match config.database_url() {
        Some(url) => {
            let pool = setup_database(url, config.db_max_connections(), config.db_timeout()).await?;
            Ok(Arc::new(PgArtifactRepository::new(pool)))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set; artifacts are kept in memory and lost on restart"
            );
            Ok(Arc::new(InMemoryArtifactRepository::new()))
        }
    }
}
