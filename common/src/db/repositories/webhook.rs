// Outbound webhook subscriptions: one row per job, tracking delivery
// attempts so a periodic sweep can retry what didn't land. Distinct from
// `common::webhook`, which performs the delivery; this is just the
// repository-per-aggregate persistence layer for it.

use crate::db::DbPool;
use crate::errors::StoreError;
use crate::models::Webhook;
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

pub struct WebhookRepository {
    pool: DbPool,
}

impl WebhookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, webhook))]
    pub async fn create(&self, webhook: &Webhook) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO webhooks (id, job_id, url, attempts, max_attempts, delivered, last_attempt_at, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(webhook.id)
        .bind(webhook.job_id)
        .bind(&webhook.url)
        .bind(webhook.attempts)
        .bind(webhook.max_attempts)
        .bind(webhook.delivered)
        .bind(webhook.last_attempt_at)
        .bind(&webhook.error_message)
        .execute(self.pool.pool())
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_for_job(&self, job_id: Uuid) -> Result<Option<Webhook>, StoreError> {
        let webhook = sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(self.pool.pool())
            .await?;
        Ok(webhook)
    }

    /// Webhooks still owed a delivery attempt, for the periodic sweep task.
    #[instrument(skip(self))]
    pub async fn list_pending(&self, limit: i64) -> Result<Vec<Webhook>, StoreError> {
        let webhooks = sqlx::query_as::<_, Webhook>(
            "SELECT * FROM webhooks WHERE delivered = false AND attempts < max_attempts LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(webhooks)
    }

    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE webhooks SET delivered = true, last_attempt_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;
        Ok(())
    }

    #[instrument(skip(self, error_message))]
    pub async fn record_attempt_failure(
        &self,
        id: Uuid,
        error_message: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE webhooks
            SET attempts = attempts + 1, last_attempt_at = $2, error_message = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .bind(error_message)
        .execute(self.pool.pool())
        .await?;
        Ok(())
    }
}
