//! Pictura Storage Library
//!
//! Object store abstraction for the ingestion pipeline, with an S3 backend
//! (AWS or any S3-compatible endpoint) and a local filesystem backend.
//!
//! # Storage key format
//!
//! Keys are plain slash-separated paths (`temp/...`, `public/...`). They must not
//! contain `..` or a leading `/`. Key derivation lives in `pictura_core::keys`
//! so every backend sees the same layout.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use pictura_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
