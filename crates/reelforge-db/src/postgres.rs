//! Postgres-backed artifact repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use reelforge_core::{
    AppError, MediaArtifact, MediaType, NewMediaArtifact, ProcessingOutcome, ProcessingStatus,
    UploaderRole,
};

use crate::repository::{not_processing, ArtifactRepository};

#[derive(Debug, sqlx::FromRow)]
struct ArtifactRow {
    id: Uuid,
    url: String,
    storage_key: String,
    media_type: MediaType,
    uploader_id: Uuid,
    uploader_role: UploaderRole,
    original_filename: String,
    caption: Option<String>,
    parent_content_id: Option<Uuid>,
    processing_status: ProcessingStatus,
    duration: Option<f64>,
    width: Option<i32>,
    height: Option<i32>,
    file_size: Option<i64>,
    codec: Option<String>,
    bitrate: Option<i64>,
    thumbnail_url: Option<String>,
    processing_error: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArtifactRow> for MediaArtifact {
    fn from(row: ArtifactRow) -> Self {
        MediaArtifact {
            id: row.id,
            url: row.url,
            storage_key: row.storage_key,
            media_type: row.media_type,
            uploader_id: row.uploader_id,
            uploader_role: row.uploader_role,
            original_filename: row.original_filename,
            caption: row.caption,
            parent_content_id: row.parent_content_id,
            processing_status: row.processing_status,
            duration: row.duration,
            width: row.width,
            height: row.height,
            file_size: row.file_size,
            codec: row.codec,
            bitrate: row.bitrate,
            thumbnail_url: row.thumbnail_url,
            processing_error: row.processing_error,
            processed_at: row.processed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgArtifactRepository {
    pool: PgPool,
}

impl PgArtifactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtifactRepository for PgArtifactRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "media_artifacts", db.operation = "insert", db.record_id = %new.id))]
    async fn create(&self, new: NewMediaArtifact) -> Result<MediaArtifact, AppError> {
        let row: ArtifactRow = sqlx::query_as::<Postgres, ArtifactRow>(
            r#"
            INSERT INTO media_artifacts (
                id, url, storage_key, media_type, uploader_id, uploader_role,
                original_filename, caption, parent_content_id, processing_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(&new.url)
        .bind(&new.storage_key)
        .bind(new.media_type)
        .bind(new.uploader_id)
        .bind(new.uploader_role)
        .bind(&new.original_filename)
        .bind(&new.caption)
        .bind(new.parent_content_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_artifacts", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<MediaArtifact>, AppError> {
        let row: Option<ArtifactRow> = sqlx::query_as::<Postgres, ArtifactRow>(
            "SELECT * FROM media_artifacts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_artifacts", db.operation = "update", db.record_id = %id))]
    async fn mark_processing(&self, id: Uuid) -> Result<Option<MediaArtifact>, AppError> {
        let row: Option<ArtifactRow> = sqlx::query_as::<Postgres, ArtifactRow>(
            r#"
            UPDATE media_artifacts
            SET processing_status = 'processing', updated_at = NOW()
            WHERE id = $1
              AND media_type = 'video'
              AND (
                processing_status = 'failed'
                OR (processing_status = 'pending' AND processed_at IS NULL)
              )
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self, error), fields(db.table = "media_artifacts", db.operation = "update", db.record_id = %id))]
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<MediaArtifact, AppError> {
        let row: Option<ArtifactRow> = sqlx::query_as::<Postgres, ArtifactRow>(
            r#"
            UPDATE media_artifacts
            SET processing_status = 'failed',
                processing_error = $2,
                duration = NULL, width = NULL, height = NULL, file_size = NULL,
                codec = NULL, bitrate = NULL, thumbnail_url = NULL,
                updated_at = NOW()
            WHERE id = $1 AND processing_status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or_else(|| not_processing(id))
    }

    #[tracing::instrument(skip(self, outcome), fields(db.table = "media_artifacts", db.operation = "update", db.record_id = %id, final_status = %outcome.final_status))]
    async fn complete_processing(
        &self,
        id: Uuid,
        outcome: ProcessingOutcome,
    ) -> Result<MediaArtifact, AppError> {
        let row: Option<ArtifactRow> = sqlx::query_as::<Postgres, ArtifactRow>(
            r#"
            UPDATE media_artifacts
            SET processing_status = $2,
                duration = $3, width = $4, height = $5, file_size = $6,
                codec = $7, bitrate = $8, thumbnail_url = $9,
                processing_error = NULL,
                processed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND processing_status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(outcome.final_status)
        .bind(outcome.duration)
        .bind(outcome.width)
        .bind(outcome.height)
        .bind(outcome.file_size)
        .bind(&outcome.codec)
        .bind(outcome.bitrate)
        .bind(&outcome.thumbnail_url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or_else(|| not_processing(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_artifacts", db.operation = "select"))]
    async fn find_processing_candidates(&self, limit: i64) -> Result<Vec<MediaArtifact>, AppError> {
        let rows: Vec<ArtifactRow> = sqlx::query_as::<Postgres, ArtifactRow>(
            r#"
            SELECT * FROM media_artifacts
            WHERE media_type = 'video'
              AND (
                processing_status = 'failed'
                OR (processing_status = 'pending' AND processed_at IS NULL)
              )
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
