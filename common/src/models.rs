// Data model for the timetable extraction pipeline.
// Mirrors the data model: Job, ExtractedTimetable, TimeBlock, RecurringBlock,
// RetryLog, Webhook, plus the intermediate artifacts passed between
// components (ProcessedArtifact, ComplexityAssessment, ExtractionOutcome).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Job lifecycle
// ============================================================================

/// Status of a submitted job. Transitions form the DAG
/// `Pending -> Processing -> {Completed, Failed}` and
/// `Pending -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether `self -> next` is a legal transition in the job lifecycle.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Metadata the submitter may optionally attach to an upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobMetadataHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

/// The unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub blob_key: String,
    pub mime_type: String,
    pub original_file_name: String,
    pub size_bytes: i64,
    pub submitter_id: Option<String>,
    #[sqlx(json)]
    pub metadata: JobMetadataHint,
    pub retry_count: i32,
    pub max_retries: i32,
    pub method: Option<String>,
    pub complexity_level: Option<String>,
    pub error_message: Option<String>,
    pub result_blob_key: Option<String>,
    pub timetable_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Construct a brand new `Pending` job from a submission.
    pub fn new_pending(
        blob_key: String,
        mime_type: String,
        original_file_name: String,
        size_bytes: i64,
        submitter_id: Option<String>,
        metadata: JobMetadataHint,
        max_retries: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            blob_key,
            mime_type,
            original_file_name,
            size_bytes,
            submitter_id,
            metadata,
            retry_count: 0,
            max_retries,
            method: None,
            complexity_level: None,
            error_message: None,
            result_blob_key: None,
            timetable_id: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

// ============================================================================
// Extracted timetable
// ============================================================================

/// Weekday a TimeBlock is scoped to. Only school weekdays are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }

    /// Parse a weekday name, case-insensitively, accepting full names or
    /// 3-letter abbreviations ("Mon", "tue", ...). Used by the structured
    /// extractor's header-row detection.
    pub fn parse(s: &str) -> Option<Weekday> {
        let lower = s.trim().to_lowercase();
        Some(match lower.as_str() {
            "monday" | "mon" => Weekday::Monday,
            "tuesday" | "tue" | "tues" => Weekday::Tuesday,
            "wednesday" | "wed" => Weekday::Wednesday,
            "thursday" | "thu" | "thur" | "thurs" => Weekday::Thursday,
            "friday" | "fri" => Weekday::Friday,
            _ => return None,
        })
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete scheduled event on one weekday.
///
/// Times are stored as minute-of-day in `[0, 1440)`; always
/// `start_time < end_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub day: Weekday,
    pub start_time: u16,
    pub end_time: u16,
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub is_fixed: bool,
}

impl TimeBlock {
    pub fn is_valid(&self) -> bool {
        self.start_time < self.end_time
            && self.end_time <= 24 * 60
            && !self.event_name.trim().is_empty()
    }
}

/// A daily fixture repeating across the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringBlock {
    pub start_time: u16,
    pub end_time: u16,
    pub event_name: String,
    pub applies_daily: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RecurringBlock {
    /// Days this block covers: all weekdays when `applies_daily`, otherwise
    /// parsed out of `notes`.
    pub fn applies_to(&self, day: Weekday) -> bool {
        if self.applies_daily {
            return true;
        }
        match &self.notes {
            Some(notes) => notes
                .split(|c: char| !c.is_alphanumeric())
                .filter_map(Weekday::parse)
                .any(|d| d == day),
            None => false,
        }
    }

    /// True if `[start, end)` overlaps this block's window at all.
    pub fn intersects(&self, start: u16, end: u16) -> bool {
        start < self.end_time && self.start_time < end
    }
}

/// The structured result of extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedTimetable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<String>,
    #[serde(default)]
    pub blocks: Vec<TimeBlock>,
    #[serde(default)]
    pub recurring_blocks: Vec<RecurringBlock>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ExtractedTimetable {
    pub fn blocks_for(&self, day: Weekday) -> Vec<&TimeBlock> {
        self.blocks.iter().filter(|b| b.day == day).collect()
    }

    /// Apply the metadata hint the submitter provided, preferring it over
    /// whatever the backend inferred.
    pub fn apply_metadata_hint(&mut self, hint: &JobMetadataHint) {
        if let Some(teacher) = &hint.teacher_name {
            self.teacher_name = Some(teacher.clone());
        }
        if let Some(class) = &hint.class_name {
            self.class_name = Some(class.clone());
        }
    }
}

// ============================================================================
// Retry log / webhook
// ============================================================================

/// One record per failed attempt. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RetryLogEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub attempt: i32,
    #[sqlx(try_from = "String")]
    pub error_kind: ErrorKind,
    pub message: String,
    pub stack_evidence: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Subscription for job-completion notification.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Webhook {
    pub id: Uuid,
    pub job_id: Uuid,
    pub url: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub delivered: bool,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Webhook {
    pub fn new(job_id: Uuid, url: String, max_attempts: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            url,
            attempts: 0,
            max_attempts,
            delivered: false,
            last_attempt_at: None,
            error_message: None,
        }
    }

    pub fn should_attempt(&self) -> bool {
        !self.delivered && self.attempts < self.max_attempts
    }
}

// ============================================================================
// Error taxonomy
// ============================================================================

/// The error kinds the core classifies failures into, used for
/// `RetryLog.error_kind` and DLQ metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    OcrError,
    StructuredBackendError,
    VisionBackendError,
    ValidationError,
    BlobError,
    StoreError,
    EnqueueError,
    UnsupportedType,
    UnknownError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::OcrError => "ocr_error",
            ErrorKind::StructuredBackendError => "structured_backend_error",
            ErrorKind::VisionBackendError => "vision_backend_error",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::BlobError => "blob_error",
            ErrorKind::StoreError => "store_error",
            ErrorKind::EnqueueError => "enqueue_error",
            ErrorKind::UnsupportedType => "unsupported_type",
            ErrorKind::UnknownError => "unknown_error",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Pipeline intermediate artifacts
// ============================================================================

/// Output of the File Preprocessor: `{text?, imageBytes?, mime, name}`.
#[derive(Debug, Clone)]
pub struct ProcessedArtifact {
    pub name: String,
    pub mime: String,
    pub text: Option<String>,
    pub image_bytes: Option<Vec<u8>>,
}

impl ProcessedArtifact {
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Complexity level assigned by the Router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Simple,
    Medium,
    Complex,
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComplexityLevel::Simple => "simple",
            ComplexityLevel::Medium => "medium",
            ComplexityLevel::Complex => "complex",
        };
        f.write_str(s)
    }
}

/// Backend recommendation emitted alongside the complexity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedBackend {
    Structured,
    Vision,
    Hybrid,
}

/// Result of `ComplexityRouter::classify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityAssessment {
    pub level: ComplexityLevel,
    pub score: f32,
    pub reasons: Vec<String>,
    pub recommended: RecommendedBackend,
}

/// Tag recorded on a Job for the backend path actually used. `Structured`/`Vision`/`Hybrid` are the ordinary paths;
/// `VisionErrorFallback` is the in-process fallback outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Structured,
    Vision,
    Hybrid,
    VisionErrorFallback,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionMethod::Structured => "structured",
            ExtractionMethod::Vision => "vision",
            ExtractionMethod::Hybrid => "hybrid",
            ExtractionMethod::VisionErrorFallback => "vision_error_fallback",
        };
        f.write_str(s)
    }
}

/// Result of `ExtractionOrchestrator::run`.
#[derive(Debug, Clone)]
pub struct OrchestratorOutcome {
    pub data: ExtractedTimetable,
    pub method: ExtractionMethod,
    pub complexity: ComplexityLevel,
    pub elapsed_ms: u64,
}

/// The JSON body published to / received from the Job Queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobQueueMessage {
    pub job_id: Uuid,
    pub file_url: String,
    pub original_file_name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn weekday_parse_accepts_abbreviations() {
        assert_eq!(Weekday::parse("Mon"), Some(Weekday::Monday));
        assert_eq!(Weekday::parse("FRIDAY"), Some(Weekday::Friday));
        assert_eq!(Weekday::parse("Funday"), None);
    }

    #[test]
    fn time_block_validity() {
        let good = TimeBlock {
            day: Weekday::Monday,
            start_time: 540,
            end_time: 600,
            event_name: "Maths".into(),
            notes: None,
            color: None,
            confidence: None,
            is_fixed: false,
        };
        assert!(good.is_valid());

        let mut bad = good.clone();
        bad.end_time = 500;
        assert!(!bad.is_valid());
    }

    #[test]
    fn recurring_block_applies_daily() {
        let r = RecurringBlock {
            start_time: 600,
            end_time: 630,
            event_name: "Break".into(),
            applies_daily: true,
            notes: None,
        };
        assert!(r.applies_to(Weekday::Wednesday));
    }

    #[test]
    fn recurring_block_applies_on_enumerated_days() {
        let r = RecurringBlock {
            start_time: 600,
            end_time: 630,
            event_name: "Club".into(),
            applies_daily: false,
            notes: Some("Mon, Wed".to_string()),
        };
        assert!(r.applies_to(Weekday::Monday));
        assert!(r.applies_to(Weekday::Wednesday));
        assert!(!r.applies_to(Weekday::Friday));
    }

    #[test]
    fn webhook_should_attempt_respects_max_attempts() {
        let mut hook = Webhook::new(Uuid::new_v4(), "https://example.com".into(), 3);
        assert!(hook.should_attempt());
        hook.attempts = 3;
        assert!(!hook.should_attempt());
        hook.attempts = 1;
        hook.delivered = true;
        assert!(!hook.should_attempt());
    }
}
