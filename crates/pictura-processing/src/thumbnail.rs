//! Thumbnail derivation
//!
//! Renders every configured square size from the validated bytes and uploads
//! the renditions next to the permanent object.

use bytes::Bytes;
use image::ImageFormat;
use pictura_core::constants::{THUMBNAIL_CONTENT_TYPE, THUMBNAIL_SIZES};
use pictura_core::keys::{size_label, thumbnail_key};
use pictura_core::{
    PipelineError, PipelineResult, Thumbnail, ThumbnailSet, ValidatedContent, ValidationKind,
};
use pictura_storage::Storage;
use std::sync::Arc;

use crate::image::{ImageCodec, ImageResize};

/// Configuration for thumbnail generation
#[derive(Clone, Debug)]
pub struct ThumbnailConfig {
    /// Edge lengths in pixels, rendered in this order
    pub sizes: Vec<u32>,
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl ThumbnailConfig {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            sizes: THUMBNAIL_SIZES.to_vec(),
            quality,
        }
    }
}

pub struct ThumbnailDeriver {
    storage: Arc<dyn Storage>,
    config: ThumbnailConfig,
}

impl ThumbnailDeriver {
    pub fn new(storage: Arc<dyn Storage>, config: ThumbnailConfig) -> Self {
        Self { storage, config }
    }

    /// Encode every rendition. CPU-bound; runs on the blocking pool.
    fn render(
        data: &[u8],
        format: ImageFormat,
        sizes: &[u32],
        quality: u8,
    ) -> Result<Vec<(u32, Vec<u8>)>, image::ImageError> {
        let img = ImageCodec::decode(data, format)?;

        sizes
            .iter()
            .map(|&size| {
                let square = ImageResize::cover_square(&img, size);
                ImageCodec::encode_jpeg(&square, quality).map(|jpeg| (size, jpeg))
            })
            .collect()
    }

    #[tracing::instrument(skip(self, content), fields(width = content.width, height = content.height))]
    pub async fn derive(
        &self,
        content: &ValidatedContent,
        permanent_key: &str,
    ) -> PipelineResult<ThumbnailSet> {
        let start = std::time::Instant::now();
        let format = ImageFormat::from_mime_type(&content.confirmed_mime_type)
            .or_else(|| ImageCodec::sniff(&content.bytes))
            .ok_or_else(|| {
                PipelineError::validation(
                    ValidationKind::Type,
                    format!("cannot render {}", content.confirmed_mime_type),
                )
            })?;
        let data: Bytes = content.bytes.clone();
        let sizes = self.config.sizes.clone();
        let quality = self.config.quality;

        let renditions =
            tokio::task::spawn_blocking(move || Self::render(&data, format, &sizes, quality))
                .await
                .map_err(|e| PipelineError::UnknownInternal(format!("thumbnail task failed: {}", e)))?
                .map_err(|e| {
                    PipelineError::validation(
                        ValidationKind::Corruption,
                        format!("thumbnail rendering failed: {}", e),
                    )
                })?;

        let mut thumbnails = ThumbnailSet::new();
        for (size, jpeg) in renditions {
            let key = thumbnail_key(permanent_key, size);
            let public_url = self
                .storage
                .upload_with_key(&key, jpeg, THUMBNAIL_CONTENT_TYPE)
                .await?;
            thumbnails.insert(size_label(size), Thumbnail { key, public_url });
        }

        tracing::info!(
            permanent_key = %permanent_key,
            count = thumbnails.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Thumbnails derived"
        );

        Ok(thumbnails)
    }
}
