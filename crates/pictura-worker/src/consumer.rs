//! Pipeline consumer: receive loop, bounded handler pool and settlement policy.
//!
//! Shutdown: flipping the watch channel stops the receive loop. In-flight
//! handlers get `shutdown_grace` to finish; anything still running after that
//! is left unsettled and returns to the queue once its visibility expires.

use pictura_core::{FailureClass, Job, LogLevel, PipelineError, WorkerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

use crate::pipeline::{IngestPipeline, StageFailure};
use crate::queue::{Delivery, Disposition, JobQueue};
use crate::sqs::MAX_RECEIVE_BATCH;

/// Maximum delay in seconds before a requeued job becomes visible again. Caps
/// exponential backoff so that high attempt counts do not produce excessively
/// long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Computes backoff in seconds for a given attempt (exponential with cap).
#[inline]
pub fn compute_retry_backoff_seconds(attempt: u32) -> u64 {
    2_u64.saturating_pow(attempt).min(MAX_RETRY_BACKOFF_SECS)
}

/// Settlement for a failed job.
///
/// Permanent failures are dead-lettered at once. Transient failures are requeued
/// with backoff until `max_attempts` deliveries have been used up.
pub fn disposition_for(error: &PipelineError, attempt: u32, max_attempts: u32) -> Disposition {
    match error.class() {
        FailureClass::Permanent => Disposition::DeadLetter {
            reason: format!("{}: {}", error.error_code(), error),
        },
        FailureClass::Transient if attempt >= max_attempts => Disposition::DeadLetter {
            reason: format!(
                "{}: {} (gave up after {} attempts)",
                error.error_code(),
                error,
                attempt
            ),
        },
        FailureClass::Transient => Disposition::Requeue {
            delay: Duration::from_secs(compute_retry_backoff_seconds(attempt)),
        },
    }
}

#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub shutdown_grace: Duration,
    /// Pause after a failed receive before polling again.
    pub receive_error_backoff: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for ConsumerConfig {
    fn from(worker: &WorkerConfig) -> Self {
        Self {
            concurrency: worker.concurrency.max(1),
            max_attempts: worker.max_attempts.max(1),
            shutdown_grace: worker.shutdown_grace,
            receive_error_backoff: Duration::from_secs(5),
        }
    }
}

pub struct PipelineConsumer {
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<IngestPipeline>,
    config: ConsumerConfig,
}

impl PipelineConsumer {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<IngestPipeline>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            queue,
            pipeline,
            config,
        }
    }

    /// Run until `shutdown` turns true (or its sender is dropped).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency;
        tracing::info!(
            concurrency,
            max_attempts = self.config.max_attempts,
            "Pipeline consumer started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));

        loop {
            if *shutdown.borrow() {
                break;
            }

            // Hold one slot before asking for work, so a received message always
            // has a handler.
            let first_permit = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let wanted = (semaphore.available_permits() + 1).min(MAX_RECEIVE_BATCH);
            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = self.queue.receive(wanted) => result,
            };

            let deliveries = match received {
                Ok(deliveries) => deliveries,
                Err(e) => {
                    drop(first_permit);
                    tracing::error!(error = %e, "Failed to receive from queue");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.config.receive_error_backoff) => continue,
                    }
                }
            };

            let mut first_permit = Some(first_permit);
            for delivery in deliveries {
                let permit = match first_permit.take() {
                    Some(permit) => permit,
                    None => match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let queue = self.queue.clone();
                let pipeline = self.pipeline.clone();
                let max_attempts = self.config.max_attempts;
                tokio::spawn(async move {
                    let _permit = permit;
                    Self::handle_delivery(queue, pipeline, max_attempts, delivery).await;
                });
            }
        }

        tracing::info!("Pipeline consumer stopping, waiting for in-flight jobs");
        let all_permits = u32::try_from(concurrency).unwrap_or(u32::MAX);
        match tokio::time::timeout(self.config.shutdown_grace, semaphore.acquire_many(all_permits))
            .await
        {
            Ok(_) => tracing::info!("All in-flight jobs finished"),
            Err(_) => tracing::warn!(
                in_flight = concurrency.saturating_sub(semaphore.available_permits()),
                grace_secs = self.config.shutdown_grace.as_secs(),
                "Shutdown grace period elapsed; unfinished jobs will be redelivered"
            ),
        }

        self.queue.close().await;
        tracing::info!("Pipeline consumer stopped");
    }

    #[tracing::instrument(skip_all, fields(message_id = %delivery.message_id, attempt = delivery.attempt))]
    async fn handle_delivery(
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<IngestPipeline>,
        max_attempts: u32,
        delivery: Delivery,
    ) {
        let disposition = Self::decide(&pipeline, &delivery, max_attempts).await;
        let label = match &disposition {
            Disposition::Ack => "ack",
            Disposition::Requeue { .. } => "requeue",
            Disposition::DeadLetter { .. } => "dead_letter",
        };

        if let Err(e) = queue.settle(delivery, disposition).await {
            // Unsettled messages reappear after the visibility timeout.
            tracing::error!(error = %e, disposition = label, "Failed to settle delivery");
        }
    }

    async fn decide(pipeline: &IngestPipeline, delivery: &Delivery, max_attempts: u32) -> Disposition {
        let job = match Job::parse(&delivery.body) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, error_code = e.error_code(), "Rejecting malformed job");
                return disposition_for(&e, delivery.attempt, max_attempts);
            }
        };

        match pipeline.process(&job).await {
            Ok(record) => {
                tracing::info!(id = %record.id, url = %record.url, "Job committed");
                Disposition::Ack
            }
            Err(StageFailure { stage, error }) => {
                let disposition = disposition_for(&error, delivery.attempt, max_attempts);
                log_failure(&error, &disposition, &stage.to_string(), delivery.attempt);
                disposition
            }
        }
    }
}

fn log_failure(error: &PipelineError, disposition: &Disposition, stage: &str, attempt: u32) {
    let requeue_secs = match disposition {
        Disposition::Requeue { delay } => Some(delay.as_secs()),
        _ => None,
    };
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(
            error = %error,
            error_code = error.error_code(),
            stage,
            attempt,
            "Job already committed by an earlier delivery"
        ),
        LogLevel::Warn => tracing::warn!(
            error = %error,
            error_code = error.error_code(),
            stage,
            attempt,
            "Job rejected"
        ),
        LogLevel::Error => tracing::error!(
            error = %error,
            error_code = error.error_code(),
            stage,
            attempt,
            requeue_secs = ?requeue_secs,
            "Job failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pictura_core::ValidationKind;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(200), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn permanent_errors_are_dead_lettered_on_first_attempt() {
        let err = PipelineError::validation(ValidationKind::Type, "application/pdf");
        match disposition_for(&err, 1, 5) {
            Disposition::DeadLetter { reason } => assert!(reason.starts_with("VALIDATION_TYPE")),
            other => panic!("unexpected disposition {other:?}"),
        }
        assert!(matches!(
            disposition_for(&PipelineError::Conflict("dup".into()), 1, 5),
            Disposition::DeadLetter { .. }
        ));
    }

    #[test]
    fn transient_errors_are_requeued_with_backoff() {
        let err = PipelineError::TransientInfra("s3 unreachable".into());
        assert_eq!(
            disposition_for(&err, 1, 5),
            Disposition::Requeue {
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(
            disposition_for(&err, 3, 5),
            Disposition::Requeue {
                delay: Duration::from_secs(8)
            }
        );
    }

    #[test]
    fn transient_errors_stop_at_max_attempts() {
        let err = PipelineError::UnknownInternal("join error".into());
        assert!(matches!(
            disposition_for(&err, 5, 5),
            Disposition::DeadLetter { .. }
        ));
    }

    #[test]
    fn consumer_config_from_worker_config() {
        let config = ConsumerConfig::from(&WorkerConfig {
            concurrency: 0,
            max_attempts: 3,
            stage_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(7),
        });
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.shutdown_grace, Duration::from_secs(7));
    }
}
