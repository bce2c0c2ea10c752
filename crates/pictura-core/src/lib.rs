//! Pictura Core Library
//!
//! Domain types, the pipeline error taxonomy, storage key conventions and
//! environment configuration shared by every Pictura crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod keys;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, DatabaseConfig, ProcessingConfig, QueueConfig, StorageConfig, WorkerConfig};
pub use error::{FailureClass, LogLevel, PipelineError, PipelineResult, ValidationKind};
pub use models::{
    Job, NewUpload, PermanentAsset, Thumbnail, ThumbnailSet, UploadRecord, ValidatedContent,
};
pub use storage_types::StorageBackend;
