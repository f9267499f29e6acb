// Webhook subscription surface: a single create-style handler that
// attaches a delivery callback to an existing job.

use crate::handlers::{ApiErrorResponse, SuccessEnvelope};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use common::db::{JobRepository, WebhookRepository};
use common::errors::ApiError;
use common::models::Webhook;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_MAX_WEBHOOK_ATTEMPTS: i32 = 3;

#[derive(Debug, Deserialize)]
pub struct AttachWebhookRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct AttachWebhookResponse {
    #[serde(rename = "webhookId")]
    pub webhook_id: Uuid,
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    pub url: String,
}

/// `POST /api/v2/timetable/jobs/{jobId}/webhook`.
#[tracing::instrument(skip(state, req))]
pub async fn attach_webhook(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<AttachWebhookRequest>,
) -> Result<SuccessEnvelope<AttachWebhookResponse>, ApiErrorResponse> {
    if req.url.trim().is_empty() {
        return Err(ApiErrorResponse(ApiError::new(
            "MISSING_FIELD",
            "url is required",
        )));
    }

    let job_repo = JobRepository::new(state.db_pool.clone());
    job_repo
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| ApiError::new("NOT_FOUND", format!("no job with id {job_id}")))?;

    let webhook_repo = WebhookRepository::new(state.db_pool.clone());
    let webhook = Webhook::new(job_id, req.url.clone(), DEFAULT_MAX_WEBHOOK_ATTEMPTS);
    webhook_repo.create(&webhook).await?;

    Ok(SuccessEnvelope::new(AttachWebhookResponse {
        webhook_id: webhook.id,
        job_id,
        url: webhook.url,
    }))
}
