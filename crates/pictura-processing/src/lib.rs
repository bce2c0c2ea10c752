//! Pictura Processing Library
//!
//! The four stages of the ingestion pipeline. Each stage takes its store as an
//! `Arc<dyn ..>` handle and reports failures as classified `PipelineError`s.

pub mod image;
pub mod promoter;
pub mod record;
pub mod thumbnail;
pub mod validator;

// Re-export commonly used types
pub use image::{ImageCodec, ImageResize};
pub use promoter::Promoter;
pub use record::RecordWriter;
pub use thumbnail::ThumbnailDeriver;
pub use validator::ObjectValidator;
