// Submission Facade HTTP surface: `POST /api/v2/timetable/upload`.
// Parses the multipart upload and hands the bytes to `common::submission`,
// which does the real validation and persistence work; this handler only
// shapes the request and the `202 Accepted` response.

use crate::handlers::{AcceptedEnvelope, ApiErrorResponse};
use crate::state::AppState;
use axum::extract::{Multipart, State};
use chrono::{DateTime, Utc};
use common::db::JobRepository;
use common::errors::{ApiError, SubmissionError};
use common::models::JobMetadataHint;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    pub status: &'static str,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "statusUrl")]
    pub status_url: String,
    #[serde(rename = "webhookRegistered")]
    pub webhook_registered: bool,
}

/// `POST /api/v2/timetable/upload`. Multipart fields: `file` (required),
/// `teacherName`, `className`, `webhookUrl` (all optional).
#[tracing::instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<AcceptedEnvelope<UploadResponse>, ApiErrorResponse> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut mime_type: Option<String> = None;
    let mut original_file_name: Option<String> = None;
    let mut metadata = JobMetadataHint::default();
    let mut webhook_url: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiErrorResponse(ApiError::new("MISSING_FIELD", format!("malformed multipart body: {e}")))
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                original_file_name = field.file_name().map(|s| s.to_string());
                mime_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    ApiErrorResponse(ApiError::new(
                        "MISSING_FIELD",
                        format!("failed to read file field: {e}"),
                    ))
                })?;
                file_bytes = Some(bytes.to_vec());
            }
            "teacherName" => {
                metadata.teacher_name = Some(text_field(field).await?);
            }
            "className" => {
                metadata.class_name = Some(text_field(field).await?);
            }
            "webhookUrl" => {
                webhook_url = Some(text_field(field).await?);
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or(SubmissionError::MissingField("file".to_string()))?;
    let mime_type = mime_type.ok_or(SubmissionError::MissingField("mimeType".to_string()))?;
    let original_file_name =
        original_file_name.ok_or(SubmissionError::MissingField("originalFileName".to_string()))?;

    let webhook_registered = webhook_url.is_some();
    let job_id = state
        .submission
        .submit(
            &bytes,
            &mime_type,
            &original_file_name,
            metadata,
            None,
            webhook_url,
        )
        .await?;

    let job_repo = JobRepository::new(state.db_pool.clone());
    let job = job_repo
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| ApiError::new("STORE_ERROR", "job vanished immediately after creation"))?;

    Ok(AcceptedEnvelope(UploadResponse {
        job_id,
        status: "pending",
        created_at: job.created_at,
        status_url: format!("/api/v2/timetable/jobs/{job_id}"),
        webhook_registered,
    }))
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiErrorResponse> {
    field
        .text()
        .await
        .map_err(|e| ApiErrorResponse(ApiError::new("MISSING_FIELD", format!("malformed field: {e}"))))
}
