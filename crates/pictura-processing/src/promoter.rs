use pictura_core::keys::permanent_key;
use pictura_core::{PermanentAsset, PipelineError, PipelineResult};
use pictura_storage::{Storage, StorageError};
use std::sync::Arc;

/// Moves a validated object from the temp namespace to its permanent key.
///
/// The move is a copy followed by a delete. Both steps tolerate having already
/// happened, so promoting the same temp key twice yields the same asset.
pub struct Promoter {
    storage: Arc<dyn Storage>,
}

impl Promoter {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self))]
    pub async fn promote(&self, temp_key: &str) -> PipelineResult<PermanentAsset> {
        let permanent_key = permanent_key(temp_key)?;

        let public_url = match self.storage.copy(temp_key, &permanent_key).await {
            Ok(url) => url,
            Err(StorageError::NotFound(_)) => {
                if !self.storage.exists(&permanent_key).await? {
                    return Err(PipelineError::NotFound(temp_key.to_string()));
                }
                tracing::debug!(
                    permanent_key = %permanent_key,
                    "Temp object already promoted"
                );
                self.storage.public_url(&permanent_key)
            }
            Err(e) => return Err(e.into()),
        };

        match self.storage.delete(temp_key).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => {
                // The permanent copy is in place; a redelivery repeats the delete.
                tracing::warn!(error = %e, temp_key = %temp_key, "Failed to delete temp object");
                return Err(e.into());
            }
        }

        tracing::info!(
            temp_key = %temp_key,
            permanent_key = %permanent_key,
            "Object promoted"
        );

        Ok(PermanentAsset {
            permanent_key,
            public_url,
        })
    }
}
