use chrono::{DateTime, Utc};
use pictura_core::{NewUpload, UploadRecord};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::DbError;

/// Trait for upload metadata operations
/// This abstracts the database implementation (PostgreSQL)
#[async_trait::async_trait]
pub trait UploadStore: Send + Sync {
    /// Insert a finalized upload. Fails with [`DbError::Conflict`] when a record
    /// for the same permanent URL already exists.
    async fn insert(&self, upload: NewUpload) -> Result<UploadRecord, DbError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UploadRecord>, DbError>;

    /// All uploads, newest first.
    async fn find_all(&self) -> Result<Vec<UploadRecord>, DbError>;
}

#[derive(Debug, FromRow)]
struct UploadRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    filename: String,
    url: String,
    mime_type: String,
    size: i64,
    uploaded_at: DateTime<Utc>,
    thumbnails: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UploadRow> for UploadRecord {
    fn from(row: UploadRow) -> Self {
        UploadRecord {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            filename: row.filename,
            url: row.url,
            mime_type: row.mime_type,
            size: row.size,
            uploaded_at: row.uploaded_at,
            thumbnails: row.thumbnails.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const UPLOAD_COLUMNS: &str = "id, first_name, last_name, filename, url, mime_type, size, \
     uploaded_at, thumbnails, created_at, updated_at";

/// Repository for finalized uploads
#[derive(Clone)]
pub struct UploadRepository {
    pool: PgPool,
}

impl UploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UploadStore for UploadRepository {
    #[tracing::instrument(skip(self, upload), fields(db.table = "uploads", db.operation = "insert", upload.url = %upload.url))]
    async fn insert(&self, upload: NewUpload) -> Result<UploadRecord, DbError> {
        let query = format!(
            r#"
            INSERT INTO uploads (first_name, last_name, filename, url, mime_type, size, uploaded_at, thumbnails)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            UPLOAD_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, UploadRow>(&query)
            .bind(&upload.first_name)
            .bind(&upload.last_name)
            .bind(&upload.filename)
            .bind(&upload.url)
            .bind(&upload.mime_type)
            .bind(upload.size)
            .bind(upload.uploaded_at)
            .bind(Json(&upload.thumbnails))
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(id = %row.id, "Upload record inserted");

        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UploadRecord>, DbError> {
        let query = format!("SELECT {} FROM uploads WHERE id = $1", UPLOAD_COLUMNS);

        let row = sqlx::query_as::<Postgres, UploadRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UploadRecord::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    async fn find_all(&self) -> Result<Vec<UploadRecord>, DbError> {
        let query = format!(
            "SELECT {} FROM uploads ORDER BY created_at DESC, id ASC",
            UPLOAD_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, UploadRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(UploadRecord::from).collect())
    }
}
