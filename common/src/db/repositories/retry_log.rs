// Append-only audit trail of failed attempts, one repository per
// aggregate like the rest of this module; rows are inserted, never updated.

use crate::db::DbPool;
use crate::errors::StoreError;
use crate::models::{ErrorKind, RetryLogEntry};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

pub struct RetryLogRepository {
    pool: DbPool,
}

impl RetryLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, message))]
    pub async fn append(
        &self,
        job_id: Uuid,
        attempt: i32,
        error_kind: ErrorKind,
        message: &str,
        stack_evidence: Option<&str>,
    ) -> Result<RetryLogEntry, StoreError> {
        let entry = RetryLogEntry {
            id: Uuid::new_v4(),
            job_id,
            attempt,
            error_kind,
            message: message.to_string(),
            stack_evidence: stack_evidence.map(|s| s.to_string()),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO retry_log (id, job_id, attempt, error_kind, message, stack_evidence, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.job_id)
        .bind(entry.attempt)
        .bind(entry.error_kind)
        .bind(&entry.message)
        .bind(&entry.stack_evidence)
        .bind(entry.created_at)
        .execute(self.pool.pool())
        .await?;

        Ok(entry)
    }

    #[instrument(skip(self))]
    pub async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<RetryLogEntry>, StoreError> {
        let entries = sqlx::query_as::<_, RetryLogEntry>(
            "SELECT * FROM retry_log WHERE job_id = $1 ORDER BY attempt ASC",
        )
        .bind(job_id)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(entries)
    }
}
