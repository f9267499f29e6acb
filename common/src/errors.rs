// Error taxonomy for the extraction pipeline.
// Uses the same layered thiserror-enum shape seen throughout this workspace (ScheduleError /
// ExecutionError / ... -> ApiError): one enum per component boundary plus
// a single PipelineError that carries the error-kind taxonomy so the
// Worker Pool can route retries without substring-matching messages.

use crate::models::ErrorKind;
use thiserror::Error;

/// Errors raised by the Blob Store adapter.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("failed to put object '{key}': {reason}")]
    Put { key: String, reason: String },
    #[error("failed to get object '{key}': {reason}")]
    Get { key: String, reason: String },
    #[error("failed to delete object '{key}': {reason}")]
    Delete { key: String, reason: String },
}

/// Errors raised by the Job Queue adapter.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("failed to send message: {0}")]
    Send(String),
    #[error("failed to receive messages: {0}")]
    Receive(String),
    #[error("failed to delete message: {0}")]
    Delete(String),
    #[error("failed to send to dead-letter queue: {0}")]
    SendDlq(String),
    #[error("failed to deserialize message body: {0}")]
    Deserialize(String),
}

/// Errors raised by the Job Store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("conditional update matched no rows (job {job_id} not in expected state)")]
    ConditionalUpdateMissed { job_id: String },
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::QueryFailed(other.to_string()),
        }
    }
}

/// Errors raised by the File Preprocessor.
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("unsupported MIME type: {0}")]
    UnsupportedType(String),
    #[error("failed to decode image: {0}")]
    ImageDecode(String),
    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Errors raised by an extraction backend.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("structured backend error: {0}")]
    Structured(String),
    #[error("vision backend error: {0}")]
    Vision(String),
    #[error("response failed schema validation: {0}")]
    Validation(String),
}

/// The single error type the Worker Pool reasons about.
/// Every component error converts into this via `From` so the retry
/// protocol can dispatch on `.kind()` rather than message content.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Extractor(#[from] ExtractorError),
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// Classify this error into the taxonomy for RetryLog/DLQ metadata.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Blob(_) => ErrorKind::BlobError,
            PipelineError::Queue(QueueError::Send(_)) => ErrorKind::EnqueueError,
            PipelineError::Queue(_) => ErrorKind::UnknownError,
            PipelineError::Store(_) => ErrorKind::StoreError,
            PipelineError::Preprocess(PreprocessError::UnsupportedType(_)) => {
                ErrorKind::UnsupportedType
            }
            PipelineError::Preprocess(PreprocessError::Ocr(_)) => ErrorKind::OcrError,
            PipelineError::Preprocess(_) => ErrorKind::UnknownError,
            PipelineError::Extractor(ExtractorError::Structured(_)) => {
                ErrorKind::StructuredBackendError
            }
            PipelineError::Extractor(ExtractorError::Vision(_)) => ErrorKind::VisionBackendError,
            PipelineError::Extractor(ExtractorError::Validation(_)) => ErrorKind::ValidationError,
            PipelineError::Unknown(_) => ErrorKind::UnknownError,
        }
    }
}

/// Client-facing input errors surfaced synchronously by the Submission
/// Facade. No job is created for these.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("unsupported MIME type: {0}")]
    UnsupportedType(String),
    #[error("artifact exceeds maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: i64 },
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// API response error envelope, mirroring `ApiError`.
#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        let code = match &err {
            SubmissionError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            SubmissionError::TooLarge { .. } => "TOO_LARGE",
            SubmissionError::MissingField(_) => "MISSING_FIELD",
            SubmissionError::Blob(_) => "BLOB_ERROR",
            SubmissionError::Store(_) => "STORE_ERROR",
            SubmissionError::Queue(_) => "QUEUE_ERROR",
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::NotFound(_) => "NOT_FOUND",
            _ => "STORE_ERROR",
        };
        ApiError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_kind_classification() {
        let e: PipelineError = ExtractorError::Vision("timeout".into()).into();
        assert_eq!(e.kind(), ErrorKind::VisionBackendError);

        let e: PipelineError = PreprocessError::UnsupportedType("image/bmp".into()).into();
        assert_eq!(e.kind(), ErrorKind::UnsupportedType);
    }

    #[test]
    fn submission_error_to_api_error() {
        let err = SubmissionError::TooLarge { max_bytes: 10 };
        let api: ApiError = err.into();
        assert_eq!(api.code, "TOO_LARGE");
    }
}
