// Webhook Delivery. Outbound POST of
// `{jobId, status, timestamp}` to the submitter's callback URL, tracked
// through `WebhookRepository` so a periodic sweep can retry what didn't
// land on the first attempt.

use crate::db::WebhookRepository;
use crate::models::Webhook;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct WebhookPayload {
    job_id: Uuid,
    status: &'static str,
    timestamp: DateTime<Utc>,
}

pub struct WebhookDeliverer {
    client: Client,
    repo: WebhookRepository,
}

impl WebhookDeliverer {
    pub fn new(repo: WebhookRepository, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with a static config");
        Self { client, repo }
    }

    /// Delivers a single completion notification, recording the outcome
    /// either way. Never propagates an error; delivery failures are
    /// tracked for the sweep to retry, not surfaced to the caller.
    #[tracing::instrument(skip(self), fields(webhook_id = %webhook.id, job_id = %webhook.job_id))]
    pub async fn deliver(&self, webhook: &Webhook) {
        let payload = WebhookPayload {
            job_id: webhook.job_id,
            status: "completed",
            timestamp: Utc::now(),
        };

        match self.client.post(&webhook.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                if let Err(e) = self.repo.mark_delivered(webhook.id).await {
                    tracing::error!(error = %e, "failed to record webhook delivery");
                }
            }
            Ok(response) => {
                self.record_failure(webhook.id, &format!("responded with status {}", response.status()))
                    .await;
            }
            Err(e) => {
                self.record_failure(webhook.id, &e.to_string()).await;
            }
        }
    }

    async fn record_failure(&self, id: Uuid, message: &str) {
        tracing::warn!(webhook_id = %id, error = message, "webhook delivery attempt failed");
        if let Err(e) = self.repo.record_attempt_failure(id, message).await {
            tracing::error!(error = %e, "failed to record webhook failure");
        }
    }

    /// Retries every webhook still owed a delivery attempt. Meant to be run
    /// on a fixed interval from the worker binary.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_pending(&self, batch_size: i64) {
        let pending = match self.repo.list_pending(batch_size).await {
            Ok(webhooks) => webhooks,
            Err(e) => {
                tracing::error!(error = %e, "failed to list pending webhooks");
                return;
            }
        };

        for webhook in pending {
            if webhook.should_attempt() {
                self.deliver(&webhook).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn delivers_expected_payload_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new();
        let webhook = Webhook::new(Uuid::new_v4(), format!("{}/hook", server.uri()), 3);
        let payload = WebhookPayload {
            job_id: webhook.job_id,
            status: "completed",
            timestamp: Utc::now(),
        };
        let response = client.post(&webhook.url).json(&payload).send().await.unwrap();
        assert!(response.status().is_success());
    }

    #[test]
    fn should_attempt_respects_attempt_budget() {
        let mut webhook = Webhook::new(Uuid::new_v4(), "https://example.test/hook".into(), 2);
        assert!(webhook.should_attempt());
        webhook.attempts = 2;
        assert!(!webhook.should_attempt());
        webhook.attempts = 0;
        webhook.delivered = true;
        assert!(!webhook.should_attempt());
    }
}
