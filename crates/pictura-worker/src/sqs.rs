//! Amazon SQS adapter
//!
//! Works against AWS or any SQS-compatible broker (ElasticMQ, LocalStack) via
//! `QUEUE_ENDPOINT`. Redelivery relies on the visibility timeout: an unsettled
//! message becomes visible again once it expires.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{MessageAttributeValue, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use pictura_core::{Job, QueueConfig};

use crate::queue::{Delivery, Disposition, JobQueue, QueueError, QueueResult};

/// Largest batch a single ReceiveMessage call may return.
pub const MAX_RECEIVE_BATCH: usize = 10;

/// Longest delay ChangeMessageVisibility accepts (12 hours).
const MAX_VISIBILITY_TIMEOUT_SECS: u64 = 43_200;

#[derive(Clone)]
pub struct SqsJobQueue {
    client: Client,
    queue_url: String,
    dead_letter_queue_url: Option<String>,
    wait_time_secs: i32,
    visibility_timeout_secs: i32,
}

impl SqsJobQueue {
    /// Create a new SqsJobQueue from configuration
    ///
    /// Credentials are resolved through the default AWS provider chain.
    pub async fn new(config: &QueueConfig) -> QueueResult<Self> {
        if config.queue_url.trim().is_empty() {
            return Err(QueueError::ConfigError("QUEUE_URL is empty".to_string()));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(3));
        if let Some(ref region) = config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_sqs::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(builder.build());

        tracing::info!(
            queue_url = %config.queue_url,
            dead_letter_queue = config.dead_letter_queue_url.is_some(),
            "SQS job queue configured"
        );

        Ok(Self {
            client,
            queue_url: config.queue_url.clone(),
            dead_letter_queue_url: config.dead_letter_queue_url.clone(),
            wait_time_secs: clamp_i32(config.wait_time_secs),
            visibility_timeout_secs: clamp_i32(config.visibility_timeout_secs),
        })
    }

    async fn delete(&self, receipt: &str) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| QueueError::SettleFailed(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn send(&self, queue_url: &str, body: String, reason: Option<&str>) -> QueueResult<()> {
        let mut request = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body);

        if let Some(reason) = reason {
            let attribute = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(reason)
                .build()
                .map_err(|e| QueueError::PublishFailed(e.to_string()))?;
            request = request.message_attributes("failureReason", attribute);
        }

        request
            .send()
            .await
            .map_err(|e| QueueError::PublishFailed(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

fn clamp_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl JobQueue for SqsJobQueue {
    async fn receive(&self, max: usize) -> QueueResult<Vec<Delivery>> {
        let batch = max.clamp(1, MAX_RECEIVE_BATCH) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(batch)
            .wait_time_seconds(self.wait_time_secs)
            .visibility_timeout(self.visibility_timeout_secs)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| QueueError::ReceiveFailed(DisplayErrorContext(&e).to_string()))?;

        let deliveries = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let Some(receipt) = message.receipt_handle().map(str::to_string) else {
                    tracing::warn!("Received SQS message without receipt handle");
                    return None;
                };
                let attempt = message
                    .attributes()
                    .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                    .and_then(|count| count.parse().ok())
                    .unwrap_or(1);
                Some(Delivery {
                    message_id: message.message_id().unwrap_or_default().to_string(),
                    receipt,
                    body: message.body().unwrap_or_default().as_bytes().to_vec(),
                    attempt,
                })
            })
            .collect::<Vec<_>>();

        if !deliveries.is_empty() {
            tracing::debug!(count = deliveries.len(), "Received messages");
        }

        Ok(deliveries)
    }

    async fn settle(&self, delivery: Delivery, disposition: Disposition) -> QueueResult<()> {
        match disposition {
            Disposition::Ack => self.delete(&delivery.receipt).await,
            Disposition::Requeue { delay } => {
                let timeout = delay.as_secs().min(MAX_VISIBILITY_TIMEOUT_SECS) as i32;
                self.client
                    .change_message_visibility()
                    .queue_url(&self.queue_url)
                    .receipt_handle(&delivery.receipt)
                    .visibility_timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| QueueError::SettleFailed(DisplayErrorContext(&e).to_string()))?;
                Ok(())
            }
            Disposition::DeadLetter { reason } => {
                match self.dead_letter_queue_url {
                    Some(ref dlq_url) => {
                        let body = String::from_utf8_lossy(&delivery.body).into_owned();
                        self.send(dlq_url, body, Some(&reason)).await?;
                    }
                    None => tracing::warn!(
                        message_id = %delivery.message_id,
                        reason = %reason,
                        "No dead-letter queue configured, dropping message"
                    ),
                }
                self.delete(&delivery.receipt).await
            }
        }
    }

    async fn publish(&self, job: &Job) -> QueueResult<()> {
        let body = job
            .to_payload()
            .map_err(|e| QueueError::PublishFailed(e.to_string()))?;
        self.send(&self.queue_url, body, None).await?;

        tracing::info!(temp_key = %job.temp_key, "Job published");
        Ok(())
    }

    async fn close(&self) {
        tracing::info!(queue_url = %self.queue_url, "SQS job queue closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_small_values() {
        assert_eq!(clamp_i32(20), 20);
        assert_eq!(clamp_i32(u64::MAX), i32::MAX);
    }

    #[tokio::test]
    async fn rejects_empty_queue_url() {
        let config = QueueConfig {
            queue_url: " ".to_string(),
            dead_letter_queue_url: None,
            endpoint: None,
            region: Some("us-east-1".to_string()),
            wait_time_secs: 20,
            visibility_timeout_secs: 600,
        };
        assert!(matches!(
            SqsJobQueue::new(&config).await,
            Err(QueueError::ConfigError(_))
        ));
    }
}
