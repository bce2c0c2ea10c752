//! Per-job stage sequencing
//!
//! Runs validate, promote, derive and persist in strict order. Each stage is
//! bounded by the stage timeout; an overrun is a transient failure.

use pictura_core::{Job, PipelineError, PipelineResult, ProcessingConfig, UploadRecord};
use pictura_db::UploadStore;
use pictura_processing::thumbnail::ThumbnailConfig;
use pictura_processing::{ObjectValidator, Promoter, RecordWriter, ThumbnailDeriver};
use pictura_storage::Storage;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Where a job is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Promoting,
    DerivingThumbnails,
    Persisting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validating => write!(f, "validating"),
            Stage::Promoting => write!(f, "promoting"),
            Stage::DerivingThumbnails => write!(f, "deriving_thumbnails"),
            Stage::Persisting => write!(f, "persisting"),
        }
    }
}

/// A failed job, with the stage that failed.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

pub struct IngestPipeline {
    validator: ObjectValidator,
    promoter: Promoter,
    deriver: ThumbnailDeriver,
    writer: RecordWriter,
    stage_timeout: Duration,
}

impl IngestPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        uploads: Arc<dyn UploadStore>,
        processing: ProcessingConfig,
        stage_timeout: Duration,
    ) -> Self {
        let thumbnails = ThumbnailConfig::with_quality(processing.thumbnail_quality);
        Self {
            validator: ObjectValidator::new(storage.clone(), processing),
            promoter: Promoter::new(storage.clone()),
            deriver: ThumbnailDeriver::new(storage, thumbnails),
            writer: RecordWriter::new(uploads),
            stage_timeout,
        }
    }

    async fn run_stage<T, F>(&self, stage: Stage, fut: F) -> Result<T, StageFailure>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        let start = std::time::Instant::now();
        let result = match tokio::time::timeout(self.stage_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::TransientInfra(format!(
                "{} timed out after {}s",
                stage,
                self.stage_timeout.as_secs()
            ))),
        };

        tracing::debug!(
            stage = %stage,
            ok = result.is_ok(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stage finished"
        );

        result.map_err(|error| StageFailure { stage, error })
    }

    /// Process one job through every stage.
    #[tracing::instrument(skip(self, job), fields(temp_key = %job.temp_key, filename = %job.original_filename))]
    pub async fn process(&self, job: &Job) -> Result<UploadRecord, StageFailure> {
        let content = self
            .run_stage(Stage::Validating, self.validator.validate(job))
            .await?;

        let asset = self
            .run_stage(Stage::Promoting, self.promoter.promote(&job.temp_key))
            .await?;

        let thumbnails = self
            .run_stage(
                Stage::DerivingThumbnails,
                self.deriver.derive(&content, &asset.permanent_key),
            )
            .await?;

        self.run_stage(
            Stage::Persisting,
            self.writer.persist(job, &asset.public_url, &thumbnails),
        )
        .await
    }
}
