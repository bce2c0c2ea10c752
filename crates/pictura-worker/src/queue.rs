//! Queue client abstraction
//!
//! The consumer talks to the broker only through [`JobQueue`]. Every received
//! [`Delivery`] must be settled exactly once; `settle` takes it by value.

use async_trait::async_trait;
use pictura_core::Job;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Settlement failed: {0}")]
    SettleFailed(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Queue configuration error: {0}")]
    ConfigError(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// One received message instance.
#[derive(Debug)]
pub struct Delivery {
    pub message_id: String,
    /// Broker handle used to settle this instance.
    pub receipt: String,
    pub body: Vec<u8>,
    /// 1 on first delivery, incremented by the broker on each redelivery.
    pub attempt: u32,
}

/// How a delivery is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Processing finished; remove the message.
    Ack,
    /// Make the message visible again after `delay`.
    Requeue { delay: Duration },
    /// Remove the message without redelivery, keeping a copy on the
    /// dead-letter queue when one is configured.
    DeadLetter { reason: String },
}

/// Durable, at-least-once job queue
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Wait for up to `max` deliveries. May return an empty batch.
    async fn receive(&self, max: usize) -> QueueResult<Vec<Delivery>>;

    async fn settle(&self, delivery: Delivery, disposition: Disposition) -> QueueResult<()>;

    async fn publish(&self, job: &Job) -> QueueResult<()>;

    /// Release broker resources. Called once after the consumer stopped.
    async fn close(&self) {}
}
