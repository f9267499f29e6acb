// Worker Pool. N concurrent drainers, each long-polling
// the Job Queue independently, running a dequeued job through preprocess ->
// orchestrate -> store, and handling the retry/DLQ protocol on failure.

use crate::config::PipelineConfig;
use crate::db::{JobRepository, RetryLogRepository, TimetableRepository, WebhookRepository};
use crate::errors::PipelineError;
use crate::models::JobMetadataHint;
use crate::orchestrator::Orchestrator;
use crate::preprocessor::{self, OcrEngine};
use crate::queue::{JobQueue, QueuedMessage};
use crate::retry;
use crate::storage::BlobStore;
use crate::telemetry;
use crate::webhook::WebhookDeliverer;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct WorkerPool {
    queue: Arc<dyn JobQueue>,
    blob_store: Arc<dyn BlobStore>,
    job_repo: JobRepository,
    retry_log_repo: RetryLogRepository,
    timetable_repo: TimetableRepository,
    webhook_repo: WebhookRepository,
    orchestrator: Arc<Orchestrator>,
    webhook_deliverer: Arc<WebhookDeliverer>,
    ocr: Arc<dyn OcrEngine>,
    config: PipelineConfig,
}

impl WorkerPool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<dyn JobQueue>,
        blob_store: Arc<dyn BlobStore>,
        job_repo: JobRepository,
        retry_log_repo: RetryLogRepository,
        timetable_repo: TimetableRepository,
        webhook_repo: WebhookRepository,
        orchestrator: Arc<Orchestrator>,
        webhook_deliverer: Arc<WebhookDeliverer>,
        ocr: Arc<dyn OcrEngine>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            queue,
            blob_store,
            job_repo,
            retry_log_repo,
            timetable_repo,
            webhook_repo,
            orchestrator,
            webhook_deliverer,
            ocr,
            config,
        }
    }

    /// Spawns `worker_concurrency` independent drainer tasks. Each exits
    /// cleanly once `shutdown` carries `true`, which the worker binary
    /// sends on SIGTERM/SIGINT.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.config.worker_concurrency)
            .map(|worker_id| {
                let pool = Arc::clone(&self);
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    tracing::info!(worker_id, "drainer started");
                    loop {
                        tokio::select! {
                            changed = shutdown.changed() => {
                                if changed.is_err() || *shutdown.borrow() {
                                    tracing::info!(worker_id, "drainer shutting down");
                                    break;
                                }
                            }
                            result = pool.drain_once() => {
                                if let Err(e) = result {
                                    tracing::error!(worker_id, error = %e, "drain cycle failed");
                                }
                            }
                        }
                    }
                })
            })
            .collect()
    }

    async fn drain_once(&self) -> Result<(), PipelineError> {
        let messages = self
            .queue
            .receive(1, self.config.long_poll_secs)
            .await?;

        for message in &messages {
            self.process_message(message).await;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(job_id = %message.body.job_id))]
    async fn process_message(&self, message: &QueuedMessage) {
        let job_id = message.body.job_id;

        match self.job_repo.start_processing(job_id).await {
            Ok(true) => {}
            Ok(false) => {
                // Job is cancelled, completed, or failed: none of those are
                // claimable, so this delivery is stale. Pending and
                // processing rows are both claimable (the latter covers
                // redelivery after a visibility-timeout expiry or a retry),
                // so reaching here means there is nothing left to do.
                tracing::info!(job_id = %job_id, "job not claimable, dropping delivery");
                let _ = self.queue.delete(message).await;
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "failed to claim job, leaving for redelivery");
                let _ = self.queue.retry_later(message).await;
                return;
            }
        }

        if let Err(e) = self.process_claimed_job(message).await {
            tracing::error!(job_id = %job_id, error = %e, "job processing failed");
            if let Err(retry_err) = retry::handle_failure(
                &self.job_repo,
                &self.retry_log_repo,
                self.queue.as_ref(),
                message,
                &e,
            )
            .await
            {
                tracing::error!(job_id = %job_id, error = %retry_err, "retry protocol itself failed");
            }
        }
    }

    async fn process_claimed_job(&self, message: &QueuedMessage) -> Result<(), PipelineError> {
        let job_id = message.body.job_id;
        let blob = self.blob_store.get(&message.body.file_url).await?;

        let artifact = preprocessor::preprocess(
            &blob,
            &message.body.mime_type,
            &message.body.original_file_name,
            self.ocr.as_ref(),
        )
        .await?;

        let hint = JobMetadataHint {
            teacher_name: message.body.teacher_name.clone(),
            class_name: message.body.class_name.clone(),
        };

        let outcome = self.orchestrator.run(&artifact, &hint).await?;

        let result_blob_key = format!("results/{job_id}/extraction-result.json");
        let result_bytes = serde_json::to_vec(&outcome.data)
            .map_err(|e| PipelineError::Unknown(format!("failed to serialize result: {e}")))?;
        self.blob_store.put(&result_blob_key, &result_bytes).await?;

        let timetable_id = self.timetable_repo.create(&outcome.data).await?;

        let completed = self
            .job_repo
            .complete(
                job_id,
                &outcome.method.to_string(),
                &outcome.complexity.to_string(),
                &result_blob_key,
                timetable_id,
            )
            .await?;

        if !completed {
            // A duplicate delivery of the same message already completed
            // this job. The work is done either way.
            tracing::info!(job_id = %job_id, "job already completed by a prior delivery, dropping duplicate");
            self.queue.delete(message).await?;
            return Ok(());
        }

        telemetry::record_job_completed(&job_id, &outcome.method.to_string());
        telemetry::record_backend_duration(
            &outcome.method.to_string(),
            outcome.elapsed_ms as f64 / 1000.0,
        );
        self.queue.delete(message).await?;

        if let Ok(Some(webhook)) = self.webhook_repo.find_for_job(job_id).await {
            if webhook.should_attempt() {
                self.webhook_deliverer.deliver(&webhook).await;
            }
        }

        Ok(())
    }
}
