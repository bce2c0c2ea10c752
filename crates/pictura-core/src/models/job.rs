use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::keys;

/// One uploaded file awaiting processing.
///
/// Published by ingress after it wrote the original bytes under `temp_key`.
/// The wire format is camelCase JSON; `tempS3Key` is accepted for `tempKey`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "firstName")]
    pub owner_first_name: String,
    #[serde(rename = "lastName")]
    pub owner_last_name: String,
    #[serde(rename = "filename")]
    pub original_filename: String,
    #[serde(rename = "tempKey", alias = "tempS3Key")]
    pub temp_key: String,
    #[serde(rename = "mimeType")]
    pub declared_mime_type: String,
    #[serde(rename = "size")]
    pub declared_size: u64,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,
}

impl Job {
    /// Decode a queue payload. Any decoding or shape problem is a `MalformedJob`.
    pub fn parse(payload: &[u8]) -> PipelineResult<Self> {
        let job: Job = serde_json::from_slice(payload)?;
        job.check()?;
        Ok(job)
    }

    fn check(&self) -> PipelineResult<()> {
        if self.original_filename.trim().is_empty() {
            return Err(PipelineError::MalformedJob(
                "filename must not be empty".to_string(),
            ));
        }
        keys::validate_temp_key(&self.temp_key)
    }

    pub fn to_payload(&self) -> PipelineResult<String> {
        serde_json::to_string(self).map_err(|e| PipelineError::UnknownInternal(e.to_string()))
    }
}
