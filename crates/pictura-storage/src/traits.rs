//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use pictura_core::PipelineError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Connectivity and backend faults may clear up on their own; a missing
    /// object or a malformed key will not.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            StorageError::NotFound(_) | StorageError::InvalidKey(_) | StorageError::ConfigError(_)
        )
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => PipelineError::NotFound(key),
            StorageError::InvalidKey(msg) => PipelineError::MalformedJob(msg),
            StorageError::ConfigError(msg) => PipelineError::UnknownInternal(msg),
            other => PipelineError::TransientInfra(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// Implementations must tolerate concurrent independent operations, and
/// writes to an existing key must overwrite it.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Upload data to a specific storage key, replacing any existing object.
    /// Returns the public URL for the uploaded file.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Delete a file by its storage key
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the size in bytes of an object, if it exists.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Copy a file from one key to another, replacing the destination.
    /// Returns the public URL of the destination.
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<String>;

    /// Public URL of a key; a pure function of the backend location and the key.
    fn public_url(&self, storage_key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_permanent_not_found() {
        let err: PipelineError = StorageError::NotFound("temp/a/b.jpg".into()).into();
        assert!(matches!(err, PipelineError::NotFound(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn backend_faults_map_to_transient_infra() {
        for storage_err in [
            StorageError::CopyFailed("connection reset".into()),
            StorageError::BackendError("timeout".into()),
            StorageError::UploadFailed("503".into()),
        ] {
            assert!(storage_err.is_transient());
            let err: PipelineError = storage_err.into();
            assert!(matches!(err, PipelineError::TransientInfra(_)));
        }
    }

    #[test]
    fn invalid_key_is_permanent() {
        let storage_err = StorageError::InvalidKey("../x".into());
        assert!(!storage_err.is_transient());
        let err: PipelineError = storage_err.into();
        assert!(!err.is_recoverable());
    }
}
