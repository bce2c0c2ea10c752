//! In-memory collaborators for pipeline integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use image::{ImageFormat, Rgb, RgbImage};
use pictura_core::{Job, NewUpload, ProcessingConfig, UploadRecord};
use pictura_db::{DbError, UploadStore};
use pictura_storage::{Storage, StorageBackend, StorageError, StorageResult};
use pictura_worker::{Delivery, Disposition, IngestPipeline, JobQueue, QueueError, QueueResult};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

pub const BASE_URL: &str = "https://uploads.s3.eu-west-1.amazonaws.com";

/// Mock storage implementation that stores objects in memory
#[derive(Default)]
pub struct MockStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    /// When set, copy fails with a connectivity error.
    fail_copy: AtomicBool,
    /// When set, uploads fail with a connectivity error.
    fail_upload: AtomicBool,
    copies: AtomicUsize,
    /// Downloads of a gated key wait for a permit.
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    downloads_in_flight: AtomicUsize,
    max_downloads_in_flight: AtomicUsize,
}

impl MockStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_file(&self, key: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn get_file(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn set_fail_copy(&self, fail: bool) {
        self.fail_copy.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub fn copy_count(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    /// Hold downloads of `key` until `gate` hands out a permit.
    pub fn gate_download(&self, key: &str, gate: Arc<Semaphore>) {
        self.gates.lock().unwrap().insert(key.to_string(), gate);
    }

    pub fn downloads_in_flight(&self) -> usize {
        self.downloads_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_downloads_in_flight(&self) -> usize {
        self.max_downloads_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until exactly `n` downloads are in flight.
    pub async fn wait_for_downloads_in_flight(&self, n: usize) {
        for _ in 0..500 {
            if self.downloads_in_flight() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} downloads in flight, got {}",
            n,
            self.downloads_in_flight()
        );
    }

    /// Key for a public URL produced by this storage.
    pub fn key_for_url(url: &str) -> Option<&str> {
        url.strip_prefix(BASE_URL)?.strip_prefix('/')
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let now = self.downloads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_downloads_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().get(storage_key).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        self.downloads_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.get_file(storage_key)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("connection reset by peer".into()));
        }
        self.set_file(storage_key, data);
        Ok(self.public_url(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        match self.files.lock().unwrap().remove(storage_key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(storage_key.to_string())),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.has_file(storage_key))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        self.get_file(storage_key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<String> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(StorageError::CopyFailed("connection timed out".into()));
        }
        let data = self
            .get_file(from_key)
            .ok_or_else(|| StorageError::NotFound(from_key.to_string()))?;
        self.set_file(to_key, data);
        Ok(self.public_url(to_key))
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", BASE_URL, storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// In-memory upload store with a unique index on `url`
#[derive(Default)]
pub struct MockUploadStore {
    records: Mutex<Vec<UploadRecord>>,
    unavailable: AtomicBool,
}

impl MockUploadStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<UploadRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl UploadStore for MockUploadStore {
    async fn insert(&self, upload: NewUpload) -> Result<UploadRecord, DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("connection refused".into()));
        }
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.url == upload.url) {
            return Err(DbError::Conflict(
                "duplicate key value violates unique constraint \"idx_uploads_url\"".into(),
            ));
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
        Ok(self.records().into_iter().find(|r| r.id == id))
    }

    async fn find_all(&self) -> Result<Vec<UploadRecord>, DbError> {
        Ok(self.records())
    }
}

/// A settlement recorded by [`MemoryQueue`].
#[derive(Debug, Clone)]
pub struct Settlement {
    pub message_id: String,
    pub attempt: u32,
    pub disposition: Disposition,
}

/// In-memory queue. Requeued messages become available again immediately with
/// their attempt count incremented; delays are recorded, not honored.
#[derive(Default)]
pub struct MemoryQueue {
    pending: Mutex<VecDeque<Delivery>>,
    settlements: Mutex<Vec<Settlement>>,
    published: Mutex<Vec<Job>>,
    next_id: AtomicUsize,
    fail_receives: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_raw(&self, body: &[u8]) -> String {
        let id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().unwrap().push_back(Delivery {
            message_id: id.clone(),
            receipt: format!("receipt-{}", id),
            body: body.to_vec(),
            attempt: 1,
        });
        id
    }

    pub fn push_job(&self, job: &Job) -> String {
        self.push_raw(job.to_payload().unwrap().as_bytes())
    }

    /// Make the next `n` receive calls fail.
    pub fn fail_next_receives(&self, n: usize) {
        self.fail_receives.store(n, Ordering::SeqCst);
    }

    pub fn settlements(&self) -> Vec<Settlement> {
        self.settlements.lock().unwrap().clone()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until `n` settlements have been recorded.
    pub async fn wait_for_settlements(&self, n: usize) -> Vec<Settlement> {
        for _ in 0..500 {
            let settlements = self.settlements();
            if settlements.len() >= n {
                return settlements;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} settlements, got {:?}",
            n,
            self.settlements()
        );
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn receive(&self, max: usize) -> QueueResult<Vec<Delivery>> {
        let remaining = self.fail_receives.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_receives.store(remaining - 1, Ordering::SeqCst);
            return Err(QueueError::ReceiveFailed("broker unreachable".into()));
        }

        let batch: Vec<Delivery> = {
            let mut pending = self.pending.lock().unwrap();
            let n = max.min(pending.len());
            pending.drain(..n).collect()
        };
        if batch.is_empty() {
            // Stand-in for a long poll.
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(batch)
    }

    async fn settle(&self, delivery: Delivery, disposition: Disposition) -> QueueResult<()> {
        self.settlements.lock().unwrap().push(Settlement {
            message_id: delivery.message_id.clone(),
            attempt: delivery.attempt,
            disposition: disposition.clone(),
        });
        if let Disposition::Requeue { .. } = disposition {
            self.pending.lock().unwrap().push_back(Delivery {
                attempt: delivery.attempt + 1,
                ..delivery
            });
        }
        Ok(())
    }

    async fn publish(&self, job: &Job) -> QueueResult<()> {
        self.published.lock().unwrap().push(job.clone());
        self.push_job(job);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    encode_fixture(width, height, ImageFormat::Jpeg)
}

pub fn encode_fixture(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 5) as u8, (y * 5) as u8, 128]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    buffer
}

pub fn job(filename: &str, temp_key: &str, mime_type: &str, size: u64) -> Job {
    Job {
        owner_first_name: "Ada".to_string(),
        owner_last_name: "Lovelace".to_string(),
        original_filename: filename.to_string(),
        temp_key: temp_key.to_string(),
        declared_mime_type: mime_type.to_string(),
        declared_size: size,
        uploaded_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
    }
}

pub fn pipeline(storage: Arc<MockStorage>, uploads: Arc<MockUploadStore>) -> Arc<IngestPipeline> {
    Arc::new(IngestPipeline::new(
        storage,
        uploads,
        ProcessingConfig::default(),
        Duration::from_secs(30),
    ))
}
