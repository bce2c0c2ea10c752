//! Domain models of the ingestion pipeline.

mod asset;
mod job;
mod upload;

pub use asset::{PermanentAsset, Thumbnail, ThumbnailSet, ValidatedContent};
pub use job::Job;
pub use upload::{NewUpload, UploadRecord};
