// Job Store read/cancel surface: list, fetch and cancel handlers, each
// constructing its own repository from `AppState` and extracting
// `Path`/`Query` params directly.

use crate::handlers::{ApiErrorResponse, SuccessEnvelope};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::db::{JobRepository, TimetableRepository};
use common::errors::ApiError;
use common::presentation::ExtractedTimetableView;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct JobTimestamps {
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    pub status: String,
    pub timestamps: JobTimestamps,
    #[serde(rename = "processingMethod", skip_serializing_if = "Option::is_none")]
    pub processing_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExtractedTimetableView>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    pub status: &'static str,
}

async fn to_job_response(
    timetable_repo: &TimetableRepository,
    job: common::models::Job,
) -> Result<JobResponse, ApiErrorResponse> {
    let result = match job.timetable_id {
        Some(id) => timetable_repo
            .find_by_id(id)
            .await?
            .as_ref()
            .map(ExtractedTimetableView::from),
        None => None,
    };

    Ok(JobResponse {
        job_id: job.id,
        status: job.status.to_string(),
        timestamps: JobTimestamps {
            created: job.created_at,
            started: job.started_at,
            completed: job.completed_at,
        },
        processing_method: job.method,
        complexity: job.complexity_level,
        error_message: job.error_message,
        result,
    })
}

/// `GET /api/v2/timetable/jobs/{jobId}`.
#[tracing::instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<SuccessEnvelope<JobResponse>, ApiErrorResponse> {
    let job_repo = JobRepository::new(state.db_pool.clone());
    let timetable_repo = TimetableRepository::new(state.db_pool.clone());

    let job = job_repo
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| ApiError::new("NOT_FOUND", format!("no job with id {job_id}")))?;

    Ok(SuccessEnvelope::new(to_job_response(&timetable_repo, job).await?))
}

/// `GET /api/v2/timetable/jobs`.
#[tracing::instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<SuccessEnvelope<JobListResponse>, ApiErrorResponse> {
    let job_repo = JobRepository::new(state.db_pool.clone());
    let timetable_repo = TimetableRepository::new(state.db_pool.clone());

    let jobs = job_repo.list(query.limit, query.offset).await?;
    let total = job_repo.count().await?;

    let mut responses = Vec::with_capacity(jobs.len());
    for job in jobs {
        responses.push(to_job_response(&timetable_repo, job).await?);
    }

    Ok(SuccessEnvelope::new(JobListResponse {
        jobs: responses,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// `DELETE /api/v2/timetable/jobs/{jobId}`. Only a `Pending` job can be
/// cancelled; one already claimed by the Worker Pool runs to completion.
#[tracing::instrument(skip(state))]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<SuccessEnvelope<CancelResponse>, ApiErrorResponse> {
    let job_repo = JobRepository::new(state.db_pool.clone());

    let cancelled = job_repo.cancel_if_pending(job_id).await?;
    if !cancelled {
        return Err(ApiErrorResponse(ApiError::new(
            "CONFLICT",
            "job is no longer pending and cannot be cancelled",
        )));
    }

    Ok(SuccessEnvelope::new(CancelResponse {
        job_id,
        status: "cancelled",
    }))
}
