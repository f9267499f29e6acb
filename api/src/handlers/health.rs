// Liveness/readiness probe, following the conventions of `handlers::health`.
// This one round-trips
// the database so a broken Job Store fails the probe.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};

#[tracing::instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db_pool.health_check().await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    }
}
