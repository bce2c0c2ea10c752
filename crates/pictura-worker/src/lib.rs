//! Pictura Worker
//!
//! Consumes ingestion jobs from the queue and drives each one through the
//! pipeline stages, settling every delivery exactly once.

pub mod consumer;
pub mod pipeline;
pub mod queue;
pub mod sqs;

pub use consumer::{
    compute_retry_backoff_seconds, disposition_for, ConsumerConfig, PipelineConsumer,
    MAX_RETRY_BACKOFF_SECS,
};
pub use pipeline::{IngestPipeline, Stage, StageFailure};
pub use queue::{Delivery, Disposition, JobQueue, QueueError, QueueResult};
pub use sqs::SqsJobQueue;
