// Retry / DLQ protocol. Purely visibility-timeout-driven, no
// exponential backoff, no jitter: a failed attempt is logged, the job's
// retry_count is bumped, and the message is either Nak'd for redelivery or
// moved to the dead-letter queue once `max_retries` is exhausted. Called
// from the Worker Pool whenever a dequeued job fails.

use crate::db::{JobRepository, RetryLogRepository};
use crate::errors::PipelineError;
use crate::models::JobStatus;
use crate::queue::{JobQueue, QueuedMessage};
use crate::telemetry;

/// Runs the retry protocol for one failed attempt at `message`. Returns
/// the job's status after bookkeeping: `Processing` if it was left for
/// redelivery, `Failed` if retries were exhausted and it was sent to the
/// DLQ.
#[tracing::instrument(skip_all, fields(job_id = %message.body.job_id))]
pub async fn handle_failure(
    job_repo: &JobRepository,
    retry_log_repo: &RetryLogRepository,
    queue: &dyn JobQueue,
    message: &QueuedMessage,
    error: &PipelineError,
) -> Result<JobStatus, PipelineError> {
    let job_id = message.body.job_id;
    let error_kind = error.kind();
    let error_message = error.to_string();

    let job = job_repo
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| crate::errors::StoreError::NotFound(job_id.to_string()))?;

    retry_log_repo
        .append(job_id, job.retry_count + 1, error_kind, &error_message, None)
        .await?;

    let status = job_repo.record_retry(job_id, &error_message).await?;

    match status {
        JobStatus::Failed => {
            tracing::warn!(job_id = %job_id, "retries exhausted, moving job to dead-letter queue");
            telemetry::record_dlq(&job_id);
            telemetry::record_job_failed(&job_id, &error_kind.to_string());
            queue.send_dlq(&message.body, &error_message).await?;
            queue.delete(message).await?;
        }
        _ => {
            tracing::info!(job_id = %job_id, retry_count = job.retry_count + 1, "leaving job for redelivery");
            telemetry::record_retry(&job_id);
            queue.retry_later(message).await?;
        }
    }

    Ok(status)
}
