// Job Store adapter: one repository per aggregate, conditional updates
// keyed on current status, `rows_affected() == 0` maps to NotFound.

use crate::db::DbPool;
use crate::errors::StoreError;
use crate::models::{Job, JobStatus};
use chrono::Utc;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

pub struct JobRepository {
    pool: DbPool,
}

impl JobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, job))]
    pub async fn create(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, status, blob_key, mime_type, original_file_name, size_bytes,
                submitter_id, metadata, retry_count, max_retries, method,
                complexity_level, error_message, result_blob_key, timetable_id,
                created_at, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(&job.blob_key)
        .bind(&job.mime_type)
        .bind(&job.original_file_name)
        .bind(job.size_bytes)
        .bind(&job.submitter_id)
        .bind(serde_json::to_value(&job.metadata).map_err(|e| StoreError::QueryFailed(e.to_string()))?)
        .bind(job.retry_count)
        .bind(job.max_retries)
        .bind(&job.method)
        .bind(&job.complexity_level)
        .bind(&job.error_message)
        .bind(&job.result_blob_key)
        .bind(job.timetable_id)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(self.pool.pool())
        .await?;

        tracing::info!(job_id = %job.id, "job created");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;
        Ok(job)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Job>, StoreError> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(jobs)
    }

    /// Total job count, for the list endpoint's pagination metadata.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM jobs")
            .fetch_one(self.pool.pool())
            .await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    /// Conditional transition into `Processing`, used by the Worker Pool to
    /// claim a delivery before running it. Claims out of `pending` (first
    /// delivery) or `processing` (a redelivery after the visibility timeout
    /// expired while a previous attempt was still running, or after that
    /// attempt failed and left the job in `processing` for retry). Does
    /// *not* claim `completed`, `failed`, or `cancelled` rows, so those
    /// deliveries fall through to `Ok(false)` and the caller just acks the
    /// message. `started_at` is only stamped on the first claim.
    #[instrument(skip(self))]
    pub async fn start_processing(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'processing', started_at = COALESCE(started_at, $2)
            WHERE id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Conditional transition `Processing -> Completed`. Returns `false`
    /// (rather than an error) if the job was already completed by a prior
    /// delivery of the same message.
    #[instrument(skip(self))]
    pub async fn complete(
        &self,
        id: Uuid,
        method: &str,
        complexity_level: &str,
        result_blob_key: &str,
        timetable_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                method = $2,
                complexity_level = $3,
                result_blob_key = $4,
                timetable_id = $5,
                completed_at = $6
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(method)
        .bind(complexity_level)
        .bind(result_blob_key)
        .bind(timetable_id)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark a job permanently failed (retries exhausted, retry protocol).
    /// `retry_count` is the final attempt count and must satisfy
    /// `retry_count >= max_retries` for the job to observe invariant 3.
    #[instrument(skip(self))]
    pub async fn fail(&self, id: Uuid, error_message: &str, retry_count: i32) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', retry_count = $2, error_message = $3, completed_at = $4
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(retry_count)
        .bind(error_message)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConditionalUpdateMissed {
                job_id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Marks a job `Failed` directly out of `Pending`: the Job row was created but the queue publish
    /// failed, so there is no in-flight message that will ever pick it up.
    /// This is the one terminal transition outside the normal
    /// `Pending -> Processing -> {Completed, Failed}` DAG.
    #[instrument(skip(self))]
    pub async fn fail_enqueue(&self, id: Uuid, error_message: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', error_message = $2, completed_at = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(error_message)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConditionalUpdateMissed {
                job_id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Cancel a job still in `Pending`.
    #[instrument(skip(self))]
    pub async fn cancel_if_pending(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE jobs SET status = 'cancelled' WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a retry attempt: increment `retry_count` and leave status as
    /// `Processing` for redelivery, or transition to `Failed` if retries are
    /// exhausted. Returns the job's status after the update.
    #[instrument(skip(self))]
    pub async fn record_retry(&self, id: Uuid, error_message: &str) -> Result<JobStatus, StoreError> {
        let job = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let next_retry_count = job.retry_count + 1;
        if next_retry_count >= job.max_retries {
            self.fail(id, error_message, next_retry_count).await?;
            return Ok(JobStatus::Failed);
        }

        sqlx::query("UPDATE jobs SET retry_count = $2, error_message = $3 WHERE id = $1")
            .bind(id)
            .bind(next_retry_count)
            .bind(error_message)
            .execute(self.pool.pool())
            .await?;

        Ok(JobStatus::Processing)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn smoke() {
        // Database-backed behavior is covered in integration-tests; this
        // module only wires queries, nothing to unit test in isolation.
    }
}
