//! Object validation
//!
//! Checks run cheapest first: declared metadata, then the fetched length, the
//! sniffed format, the header dimensions and finally a full decode.

use bytes::Bytes;
use pictura_core::keys::permanent_key;
use pictura_core::{
    Job, PipelineError, PipelineResult, ProcessingConfig, ValidatedContent, ValidationKind,
};
use pictura_storage::{Storage, StorageError};
use std::sync::Arc;

use crate::image::ImageCodec;

/// Fetches a temp object and checks it against type, size, dimension and
/// corruption rules.
pub struct ObjectValidator {
    storage: Arc<dyn Storage>,
    config: ProcessingConfig,
}

impl ObjectValidator {
    pub fn new(storage: Arc<dyn Storage>, config: ProcessingConfig) -> Self {
        Self { storage, config }
    }

    fn is_allowed(&self, content_type: &str) -> bool {
        let normalized = content_type.trim().to_lowercase();
        self.config
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
    }

    #[tracing::instrument(skip(self, job), fields(temp_key = %job.temp_key))]
    pub async fn validate(&self, job: &Job) -> PipelineResult<ValidatedContent> {
        if !self.is_allowed(&job.declared_mime_type) {
            return Err(PipelineError::validation(
                ValidationKind::Type,
                format!(
                    "content type {} is not allowed (allowed: {:?})",
                    job.declared_mime_type, self.config.allowed_content_types
                ),
            ));
        }

        let max_size = self.config.max_file_size_bytes;
        if job.declared_size > max_size {
            return Err(PipelineError::validation(
                ValidationKind::Size,
                format!("declared size {} bytes exceeds {} bytes", job.declared_size, max_size),
            ));
        }

        let data = self.fetch(job).await?;

        if data.is_empty() {
            return Err(PipelineError::validation(
                ValidationKind::Corruption,
                "object is empty",
            ));
        }
        if data.len() as u64 > max_size {
            return Err(PipelineError::validation(
                ValidationKind::Size,
                format!("object size {} bytes exceeds {} bytes", data.len(), max_size),
            ));
        }

        let format = ImageCodec::sniff(&data).ok_or_else(|| {
            PipelineError::validation(ValidationKind::Type, "content is not a recognized raster image")
        })?;
        let confirmed = ImageCodec::mime_type(format);
        if !self.is_allowed(confirmed) {
            return Err(PipelineError::validation(
                ValidationKind::Type,
                format!("detected content type {} is not allowed", confirmed),
            ));
        }
        if !confirmed.eq_ignore_ascii_case(job.declared_mime_type.trim()) {
            tracing::warn!(
                declared = %job.declared_mime_type,
                detected = %confirmed,
                "Declared content type does not match content"
            );
        }

        let (width, height) = ImageCodec::header_dimensions(&data, format).map_err(|e| {
            PipelineError::validation(ValidationKind::Corruption, format!("unreadable header: {}", e))
        })?;
        if width == 0 || height == 0 {
            return Err(PipelineError::validation(
                ValidationKind::Corruption,
                format!("image has no pixels ({}x{})", width, height),
            ));
        }
        if width > self.config.max_image_width || height > self.config.max_image_height {
            return Err(PipelineError::validation(
                ValidationKind::Dimension,
                format!(
                    "{}x{} exceeds {}x{}",
                    width, height, self.config.max_image_width, self.config.max_image_height
                ),
            ));
        }

        let bytes = Bytes::from(data);
        let to_decode = bytes.clone();
        tokio::task::spawn_blocking(move || ImageCodec::decode(&to_decode, format).map(|_| ()))
            .await
            .map_err(|e| PipelineError::UnknownInternal(format!("decode task failed: {}", e)))?
            .map_err(|e| {
                PipelineError::validation(ValidationKind::Corruption, format!("decode failed: {}", e))
            })?;

        tracing::debug!(
            content_type = %confirmed,
            width,
            height,
            size_bytes = bytes.len(),
            "Object validated"
        );

        Ok(ValidatedContent {
            bytes,
            confirmed_mime_type: confirmed.to_string(),
            width,
            height,
        })
    }

    /// Download the temp object after checking its stored length. When it is
    /// gone but the permanent copy exists, a previous delivery already
    /// promoted it, so continue from that copy.
    async fn fetch(&self, job: &Job) -> PipelineResult<Vec<u8>> {
        let (key, length) = self.locate(job).await?;

        let max_size = self.config.max_file_size_bytes;
        if length > max_size {
            return Err(PipelineError::validation(
                ValidationKind::Size,
                format!("object size {} bytes exceeds {} bytes", length, max_size),
            ));
        }

        match self.storage.download(&key).await {
            Ok(data) => Ok(data),
            // Moved by a concurrent delivery between the length check and the read.
            Err(StorageError::NotFound(_)) => Err(PipelineError::TransientInfra(format!(
                "object {} disappeared during validation",
                key
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Key holding the object and its length in bytes.
    async fn locate(&self, job: &Job) -> PipelineResult<(String, u64)> {
        match self.storage.content_length(&job.temp_key).await {
            Ok(length) => Ok((job.temp_key.clone(), length)),
            Err(StorageError::NotFound(_)) => {
                let promoted_key = permanent_key(&job.temp_key)?;
                match self.storage.content_length(&promoted_key).await {
                    Ok(length) => {
                        tracing::info!(
                            permanent_key = %promoted_key,
                            "Temp object already promoted, resuming from permanent copy"
                        );
                        Ok((promoted_key, length))
                    }
                    Err(StorageError::NotFound(_)) => {
                        Err(PipelineError::NotFound(job.temp_key.clone()))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}
