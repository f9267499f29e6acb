// Job Queue: abstract interface plus the NATS JetStream
// adapter, following the conventions of `queue::nats`/`publisher`/`consumer`
// trio.

pub mod nats;

pub use nats::{NatsQueue, QueuedMessage};

use crate::errors::QueueError;
use crate::models::JobQueueMessage;
use async_trait::async_trait;

/// Abstract Job Queue interface: `send`, `receive`, `delete`,
/// `sendDlq`. At-least-once delivery with a visibility timeout is the
/// adapter's responsibility; callers see only these four operations.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn send(&self, message: &JobQueueMessage) -> Result<(), QueueError>;

    /// Long-poll for up to `max_messages`, waiting up to `wait_secs` for at
    /// least one to arrive.
    async fn receive(
        &self,
        max_messages: usize,
        wait_secs: u64,
    ) -> Result<Vec<QueuedMessage>, QueueError>;

    /// Acknowledge successful processing, removing the message permanently.
    async fn delete(&self, receipt_handle: &QueuedMessage) -> Result<(), QueueError>;

    /// Release the message back for redelivery.
    async fn retry_later(&self, receipt_handle: &QueuedMessage) -> Result<(), QueueError>;

    /// Move a terminally-failed message to the dead-letter queue.
    async fn send_dlq(&self, message: &JobQueueMessage, error_message: &str) -> Result<(), QueueError>;
}
