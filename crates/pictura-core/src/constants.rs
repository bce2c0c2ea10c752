//! Fixed values of the ingestion pipeline.

/// Namespace for objects written by ingress and awaiting processing.
pub const TEMP_PREFIX: &str = "temp/";

/// Namespace for finalized, publicly addressable objects.
pub const PUBLIC_PREFIX: &str = "public/";

/// Directory name for derived renditions, next to the permanent object.
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// Edge lengths of the square thumbnails, ascending.
pub const THUMBNAIL_SIZES: [u32; 5] = [100, 200, 300, 400, 500];

/// Content type of every derived thumbnail.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 80;

pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;
/// Upper bound for `MAX_FILE_SIZE_MB`; validated objects are held in memory.
pub const MAX_FILE_SIZE_CEILING_MB: u64 = 1024;
pub const DEFAULT_MAX_IMAGE_WIDTH: u32 = 5000;
pub const DEFAULT_MAX_IMAGE_HEIGHT: u32 = 5000;

/// Content types accepted by the validator.
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

pub const SERVICE_NAME: &str = "pictura";
