pub mod calendar;
pub mod health;
pub mod jobs;
pub mod upload;
pub mod webhook;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::errors::{ApiError, StoreError, SubmissionError};
use serde::Serialize;

/// `{ success: true, data }` envelope used by every success response.
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for SuccessEnvelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Same envelope at `201/202 Accepted`, for the submission endpoint.
pub struct AcceptedEnvelope<T: Serialize>(pub T);

impl<T: Serialize> IntoResponse for AcceptedEnvelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::ACCEPTED, Json(SuccessEnvelope::new(self.0))).into_response()
    }
}

/// Wraps `common::errors::ApiError` with an axum `IntoResponse`: status
/// code chosen by error code, body is the JSON error envelope.
pub struct ApiErrorResponse(pub ApiError);

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.0.code.as_str() {
            "UNSUPPORTED_TYPE" | "TOO_LARGE" | "MISSING_FIELD" | "VALIDATION_ERROR" => {
                StatusCode::BAD_REQUEST
            }
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0)).into_response()
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        ApiErrorResponse(err)
    }
}

impl From<SubmissionError> for ApiErrorResponse {
    fn from(err: SubmissionError) -> Self {
        ApiErrorResponse(err.into())
    }
}

impl From<StoreError> for ApiErrorResponse {
    fn from(err: StoreError) -> Self {
        ApiErrorResponse(err.into())
    }
}
