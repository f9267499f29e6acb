// NATS JetStream adapter for the Job Queue: connection, publish and pull-
// consumer logic consolidated behind the `JobQueue` trait.
// JetStream's pull-consumer `ack_wait` realizes the configured visibility
// timeout; `ack()` / `ack_with(Nak)` realize `delete` / `retry_later`.

use crate::config::NatsConfig;
use crate::errors::QueueError;
use crate::models::JobQueueMessage;
use async_nats::jetstream::{
    self,
    consumer::{pull::Config as PullConfig, AckPolicy, PullConsumer},
    stream::{Config as StreamConfig, RetentionPolicy},
    AckKind, Context as JetStreamContext, Message,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// A message pulled off the queue, carrying both the deserialized payload
/// and the underlying NATS handle needed to ack/nak it.
pub struct QueuedMessage {
    pub body: JobQueueMessage,
    pub(crate) raw: Message,
}

pub struct NatsQueue {
    jetstream: JetStreamContext,
    config: NatsConfig,
    consumer: PullConsumer,
}

impl NatsQueue {
    #[instrument(skip(config), fields(url = %config.url))]
    pub async fn connect(config: NatsConfig, visibility_timeout: Duration) -> Result<Self, QueueError> {
        let client = async_nats::connect(&config.url)
            .await
            .map_err(|e| QueueError::Send(format!("failed to connect to NATS: {e}")))?;

        let jetstream = jetstream::new(client);

        let stream_config = StreamConfig {
            name: config.stream_name.clone(),
            subjects: vec![format!("{}.>", config.stream_name.to_lowercase())],
            retention: RetentionPolicy::WorkQueue,
            max_age: Duration::from_secs(86_400),
            ..Default::default()
        };
        let stream = jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| QueueError::Send(format!("failed to create stream: {e}")))?;

        let consumer_config = PullConfig {
            durable_name: Some(config.consumer_name.clone()),
            ack_policy: AckPolicy::Explicit,
            ack_wait: visibility_timeout,
            max_deliver: 10,
            ..Default::default()
        };
        let consumer = stream
            .get_or_create_consumer(&config.consumer_name, consumer_config)
            .await
            .map_err(|e| QueueError::Send(format!("failed to create consumer: {e}")))?;

        info!(stream = %config.stream_name, "NATS job queue ready");

        Ok(Self {
            jetstream,
            config,
            consumer,
        })
    }

    fn subject(&self) -> String {
        format!("{}.submit", self.config.stream_name.to_lowercase())
    }

    fn dlq_subject(&self) -> String {
        format!("{}.submit", self.config.dlq_stream_name.to_lowercase())
    }
}

#[async_trait]
impl crate::queue::JobQueue for NatsQueue {
    #[instrument(skip(self, message), fields(job_id = %message.job_id))]
    async fn send(&self, message: &JobQueueMessage) -> Result<(), QueueError> {
        let payload =
            serde_json::to_vec(message).map_err(|e| QueueError::Send(e.to_string()))?;

        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Nats-Msg-Id", message.job_id.to_string().as_str());

        self.jetstream
            .publish_with_headers(self.subject(), headers, payload.into())
            .await
            .map_err(|e| QueueError::Send(e.to_string()))?
            .await
            .map_err(|e| QueueError::Send(format!("publish ack failed: {e}")))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn receive(
        &self,
        max_messages: usize,
        wait_secs: u64,
    ) -> Result<Vec<QueuedMessage>, QueueError> {
        let mut batch = self
            .consumer
            .fetch()
            .max_messages(max_messages)
            .expires(Duration::from_secs(wait_secs).as_millis() as u64)
            .messages()
            .await
            .map_err(|e| QueueError::Receive(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(next) = batch.next().await {
            match next {
                Ok(raw) => {
                    match serde_json::from_slice::<JobQueueMessage>(&raw.payload) {
                        Ok(body) => out.push(QueuedMessage { body, raw }),
                        Err(e) => {
                            warn!(error = %e, "dropping message with malformed body");
                            let _ = raw.ack_with(AckKind::Term).await;
                        }
                    }
                }
                Err(e) => return Err(QueueError::Receive(e.to_string())),
            }
        }
        Ok(out)
    }

    async fn delete(&self, receipt_handle: &QueuedMessage) -> Result<(), QueueError> {
        receipt_handle
            .raw
            .ack()
            .await
            .map_err(|e| QueueError::Delete(e.to_string()))
    }

    async fn retry_later(&self, receipt_handle: &QueuedMessage) -> Result<(), QueueError> {
        receipt_handle
            .raw
            .ack_with(AckKind::Nak(None))
            .await
            .map_err(|e| QueueError::Delete(e.to_string()))
    }

    #[instrument(skip(self, message), fields(job_id = %message.job_id))]
    async fn send_dlq(&self, message: &JobQueueMessage, error_message: &str) -> Result<(), QueueError> {
        let envelope = serde_json::json!({
            "message": message,
            "error": error_message,
        });
        let payload =
            serde_json::to_vec(&envelope).map_err(|e| QueueError::SendDlq(e.to_string()))?;

        self.jetstream
            .publish(self.dlq_subject(), payload.into())
            .await
            .map_err(|e| QueueError::SendDlq(e.to_string()))?
            .await
            .map_err(|e| QueueError::SendDlq(format!("publish ack failed: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_are_namespaced_by_stream() {
        let config = NatsConfig {
            url: "nats://localhost:4222".into(),
            stream_name: "TIMETABLE_JOBS".into(),
            consumer_name: "workers".into(),
            dlq_stream_name: "TIMETABLE_JOBS_DLQ".into(),
        };
        // Subject derivation is pure string formatting; exercised here
        // without a live NATS connection.
        assert_eq!(
            format!("{}.submit", config.stream_name.to_lowercase()),
            "timetable_jobs.submit"
        );
        assert_eq!(
            format!("{}.submit", config.dlq_stream_name.to_lowercase()),
            "timetable_jobs_dlq.submit"
        );
    }
}
