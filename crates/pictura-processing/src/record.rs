use pictura_core::{Job, NewUpload, PipelineError, PipelineResult, ThumbnailSet, UploadRecord};
use pictura_db::UploadStore;
use std::sync::Arc;
use uuid::Uuid;

/// Persists finalized uploads and serves the read path.
pub struct RecordWriter {
    store: Arc<dyn UploadStore>,
}

impl RecordWriter {
    pub fn new(store: Arc<dyn UploadStore>) -> Self {
        Self { store }
    }

    /// Insert the record for a processed job. A record for the same URL turns
    /// into `Conflict`; other store failures are transient.
    #[tracing::instrument(skip(self, job, thumbnails), fields(url = %public_url))]
    pub async fn persist(
        &self,
        job: &Job,
        public_url: &str,
        thumbnails: &ThumbnailSet,
    ) -> PipelineResult<UploadRecord> {
        let upload = NewUpload::from_job(job, public_url.to_string(), thumbnails);
        let record = self.store.insert(upload).await?;

        tracing::info!(id = %record.id, filename = %record.filename, "Upload record committed");

        Ok(record)
    }

    pub async fn get_by_id(&self, id: Uuid) -> PipelineResult<UploadRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("upload {}", id)))
    }

    pub async fn list_all(&self) -> PipelineResult<Vec<UploadRecord>> {
        Ok(self.store.find_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pictura_core::Thumbnail;
    use pictura_db::DbError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<UploadRecord>>,
        unavailable: bool,
    }

    #[async_trait::async_trait]
    impl UploadStore for MemoryStore {
        async fn insert(&self, upload: NewUpload) -> Result<UploadRecord, DbError> {
            if self.unavailable {
                return Err(DbError::Unavailable("connection refused".into()));
            }
            let mut records = self.records.lock().unwrap();
            if records.iter().any(|r| r.url == upload.url) {
                return Err(DbError::Conflict("idx_uploads_url".into()));
            }
            let now = Utc::now();
            let record = UploadRecord {
                id: Uuid::new_v4(),
                first_name: upload.first_name,
                last_name: upload.last_name,
                filename: upload.filename,
                url: upload.url,
                mime_type: upload.mime_type,
                size: upload.size,
                uploaded_at: upload.uploaded_at,
                thumbnails: upload.thumbnails,
                created_at: now,
                updated_at: now,
            };
            records.push(record.clone());
            Ok(record)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<UploadRecord>, DbError> {
            Ok(self.records.lock().unwrap().iter().find(|r| r.id == id).cloned())
        }

        async fn find_all(&self) -> Result<Vec<UploadRecord>, DbError> {
            Ok(self.records.lock().unwrap().clone())
        }
    }

    fn job() -> Job {
        Job {
            owner_first_name: "Ada".into(),
            owner_last_name: "Lovelace".into(),
            original_filename: "cat.jpg".into(),
            temp_key: "temp/2024-01-01/abc-cat.jpg".into(),
            declared_mime_type: "image/jpeg".into(),
            declared_size: 50_000,
            uploaded_at: Utc::now(),
        }
    }

    fn thumbnails() -> ThumbnailSet {
        let mut set = ThumbnailSet::new();
        set.insert(
            "100x100".into(),
            Thumbnail {
                key: "public/2024-01-01/abc-cat/thumbnails/100x100".into(),
                public_url: "https://b.s3.r.amazonaws.com/public/2024-01-01/abc-cat/thumbnails/100x100"
                    .into(),
            },
        );
        set
    }

    #[tokio::test]
    async fn test_persist_then_read_back() {
        let writer = RecordWriter::new(Arc::new(MemoryStore::default()));
        let record = writer
            .persist(&job(), "https://b.s3.r.amazonaws.com/public/x", &thumbnails())
            .await
            .unwrap();

        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.size, 50_000);
        assert_eq!(record.thumbnails.len(), 1);
        assert_eq!(writer.get_by_id(record.id).await.unwrap(), record);
        assert_eq!(writer.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_url_is_conflict() {
        let writer = RecordWriter::new(Arc::new(MemoryStore::default()));
        writer.persist(&job(), "https://u/1", &thumbnails()).await.unwrap();

        let err = writer
            .persist(&job(), "https://u/1", &thumbnails())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Conflict(_)));
        assert_eq!(writer.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_outage_is_transient() {
        let writer = RecordWriter::new(Arc::new(MemoryStore {
            unavailable: true,
            ..Default::default()
        }));
        let err = writer
            .persist(&job(), "https://u/1", &thumbnails())
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let writer = RecordWriter::new(Arc::new(MemoryStore::default()));
        let err = writer.get_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }
}
