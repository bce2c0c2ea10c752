//! Service wiring
//!
//! Builds every store handle once and hands them to the pipeline as trait
//! objects.

pub mod server;

use anyhow::{Context, Result};
use pictura_core::Config;
use pictura_db::{setup_database, UploadRepository};
use pictura_storage::create_storage;
use pictura_worker::{ConsumerConfig, IngestPipeline, PipelineConsumer, SqsJobQueue};
use sqlx::PgPool;
use std::sync::Arc;

pub struct App {
    pub pool: PgPool,
    pub consumer: PipelineConsumer,
}

/// Connect the stores and queue and assemble the consumer.
pub async fn initialize_app(config: &Config) -> Result<App> {
    let pool = setup_database(&config.database).await?;

    let storage = create_storage(&config.storage)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(backend = %storage.backend_type(), "Storage initialized");

    let queue = SqsJobQueue::new(&config.queue)
        .await
        .context("Failed to initialize job queue")?;

    let uploads = Arc::new(UploadRepository::new(pool.clone()));
    let pipeline = Arc::new(IngestPipeline::new(
        storage,
        uploads,
        config.processing.clone(),
        config.worker.stage_timeout,
    ));

    let consumer = PipelineConsumer::new(
        Arc::new(queue),
        pipeline,
        ConsumerConfig::from(&config.worker),
    );

    Ok(App { pool, consumer })
}
