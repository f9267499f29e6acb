// FullCalendar read projection.

use crate::handlers::{ApiErrorResponse, SuccessEnvelope};
use crate::state::AppState;
use axum::extract::{Path, State};
use common::calendar::{to_fullcalendar_events, FullCalendarEvent};
use common::db::{JobRepository, TimetableRepository};
use common::errors::ApiError;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct FullCalendarMetadata {
    #[serde(rename = "teacherName", skip_serializing_if = "Option::is_none")]
    teacher_name: Option<String>,
    #[serde(rename = "className", skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    week: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FullCalendarResponse {
    events: Vec<FullCalendarEvent>,
    metadata: FullCalendarMetadata,
}

/// `GET /api/v2/timetable/jobs/{jobId}/fullcalendar`. `404`s until the job
/// has a completed extraction to project.
#[tracing::instrument(skip(state))]
pub async fn fullcalendar(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<SuccessEnvelope<FullCalendarResponse>, ApiErrorResponse> {
    let job_repo = JobRepository::new(state.db_pool.clone());
    let job = job_repo
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| ApiError::new("NOT_FOUND", format!("no job with id {job_id}")))?;

    let timetable_id = job.timetable_id.ok_or_else(|| {
        ApiError::new(
            "NOT_FOUND",
            "job has no extraction result yet (status is not completed)",
        )
    })?;

    let timetable_repo = TimetableRepository::new(state.db_pool.clone());
    let timetable = timetable_repo
        .find_by_id(timetable_id)
        .await?
        .ok_or_else(|| ApiError::new("NOT_FOUND", "extraction result not found"))?;

    Ok(SuccessEnvelope::new(FullCalendarResponse {
        events: to_fullcalendar_events(&timetable),
        metadata: FullCalendarMetadata {
            teacher_name: timetable.teacher_name.clone(),
            class_name: timetable.class_name.clone(),
            term: timetable.term.clone(),
            week: timetable.week.clone(),
        },
    }))
}
