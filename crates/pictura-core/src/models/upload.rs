use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{Job, ThumbnailSet};

/// Finalized upload as stored in and returned by the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub filename: String,
    pub url: String,
    pub mime_type: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub thumbnails: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the store assigns `id`, `created_at` and `updated_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUpload {
    pub first_name: String,
    pub last_name: String,
    pub filename: String,
    pub url: String,
    pub mime_type: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub thumbnails: BTreeMap<String, String>,
}

impl NewUpload {
    pub fn from_job(job: &Job, url: String, thumbnails: &ThumbnailSet) -> Self {
        Self {
            first_name: job.owner_first_name.clone(),
            last_name: job.owner_last_name.clone(),
            filename: job.original_filename.clone(),
            url,
            mime_type: job.declared_mime_type.clone(),
            size: i64::try_from(job.declared_size).unwrap_or(i64::MAX),
            uploaded_at: job.uploaded_at,
            thumbnails: thumbnails.urls(),
        }
    }
}
