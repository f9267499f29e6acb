// Submission Facade. The synchronous half of the
// pipeline: validates the upload, stores the artifact, creates the Job and
// optional Webhook rows, then enqueues the job for the Worker Pool.

use crate::db::{JobRepository, WebhookRepository};
use crate::errors::SubmissionError;
use crate::models::{Job, JobMetadataHint, JobQueueMessage, Webhook};
use crate::queue::JobQueue;
use crate::storage::BlobStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Builds the blob key `uploads/{owner-or-anonymous}/{epochMillis}-{name}`,
/// stripping anything that isn't alphanumeric, `.`, `-` or `_` out of the
/// original file name so it's safe to use as a path segment.
fn blob_key_for(submitter_id: Option<&str>, original_file_name: &str) -> String {
    let owner = submitter_id.filter(|s| !s.trim().is_empty()).unwrap_or("anonymous");
    let sanitized: String = original_file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let sanitized = if sanitized.trim_matches('_').is_empty() {
        "upload".to_string()
    } else {
        sanitized
    };
    format!("uploads/{owner}/{}-{sanitized}", Utc::now().timestamp_millis())
}

const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
    "image/bmp",
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const DEFAULT_MAX_WEBHOOK_ATTEMPTS: i32 = 3;

pub struct SubmissionFacade {
    blob_store: Arc<dyn BlobStore>,
    job_repo: JobRepository,
    webhook_repo: WebhookRepository,
    queue: Arc<dyn JobQueue>,
    max_upload_bytes: i64,
    max_retries: i32,
}

impl SubmissionFacade {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        job_repo: JobRepository,
        webhook_repo: WebhookRepository,
        queue: Arc<dyn JobQueue>,
        max_upload_bytes: i64,
        max_retries: i32,
    ) -> Self {
        Self {
            blob_store,
            job_repo,
            webhook_repo,
            queue,
            max_upload_bytes,
            max_retries,
        }
    }

    /// Validates and admits one artifact upload, returning the new job's
    /// id. No job row is created for a client input error.
    #[tracing::instrument(skip(self, bytes, metadata))]
    pub async fn submit(
        &self,
        bytes: &[u8],
        mime_type: &str,
        original_file_name: &str,
        metadata: JobMetadataHint,
        submitter_id: Option<String>,
        webhook_url: Option<String>,
    ) -> Result<Uuid, SubmissionError> {
        if !SUPPORTED_MIME_TYPES.contains(&mime_type) {
            return Err(SubmissionError::UnsupportedType(mime_type.to_string()));
        }
        if bytes.len() as i64 > self.max_upload_bytes {
            return Err(SubmissionError::TooLarge {
                max_bytes: self.max_upload_bytes,
            });
        }
        if original_file_name.trim().is_empty() {
            return Err(SubmissionError::MissingField("originalFileName".to_string()));
        }

        let blob_key = blob_key_for(submitter_id.as_deref(), original_file_name);
        let job = Job::new_pending(
            blob_key,
            mime_type.to_string(),
            original_file_name.to_string(),
            bytes.len() as i64,
            submitter_id,
            metadata.clone(),
            self.max_retries,
        );

        self.blob_store.put(&job.blob_key, bytes).await?;
        self.job_repo.create(&job).await?;

        if let Some(url) = webhook_url {
            let webhook = Webhook::new(job.id, url, DEFAULT_MAX_WEBHOOK_ATTEMPTS);
            self.webhook_repo.create(&webhook).await?;
        }

        let message = JobQueueMessage {
            job_id: job.id,
            file_url: job.blob_key.clone(),
            original_file_name: job.original_file_name.clone(),
            mime_type: job.mime_type.clone(),
            teacher_name: metadata.teacher_name,
            class_name: metadata.class_name,
            user_id: job.submitter_id.clone(),
        };

        if let Err(e) = self.queue.send(&message).await {
            // "enqueue_error": the row exists but nothing will ever pick
            // it up. Fail it immediately rather than leaving a Pending job
            // that silently stalls forever.
            tracing::error!(
                error = %e,
                job_id = %job.id,
                "failed to enqueue job after creation, marking failed"
            );
            let _ = self.job_repo.fail_enqueue(job.id, &e.to_string()).await;
            return Err(SubmissionError::Queue(e));
        }

        Ok(job.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_key_sanitizes_name_and_falls_back_to_anonymous() {
        let key = blob_key_for(None, "weekly grid (v2)!.png");
        assert!(key.starts_with("uploads/anonymous/"));
        assert!(key.ends_with("-weekly_grid__v2__.png"));

        let key = blob_key_for(Some("teacher-42"), "grid.pdf");
        assert!(key.starts_with("uploads/teacher-42/"));
    }

    #[test]
    fn supported_mime_list_covers_spec_formats() {
        assert!(SUPPORTED_MIME_TYPES.contains(&"image/png"));
        assert!(SUPPORTED_MIME_TYPES.contains(&"application/pdf"));
        assert!(SUPPORTED_MIME_TYPES.contains(
            &"application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(!SUPPORTED_MIME_TYPES.contains(&"application/zip"));
    }
}
