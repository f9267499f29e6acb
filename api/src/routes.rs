// HTTP route table. Multi-tenant auth is out of scope here, so there
// is no `auth_middleware`/`rbac_middleware` layer, just CORS and request
// tracing.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v2/timetable/upload",
            post(handlers::upload::upload),
        )
        .route(
            "/api/v2/timetable/jobs",
            get(handlers::jobs::list_jobs),
        )
        .route(
            "/api/v2/timetable/jobs/:jobId",
            get(handlers::jobs::get_job),
        )
        .route(
            "/api/v2/timetable/jobs/:jobId",
            delete(handlers::jobs::cancel_job),
        )
        .route(
            "/api/v2/timetable/jobs/:jobId/webhook",
            post(handlers::webhook::attach_webhook),
        )
        .route(
            "/api/v2/timetable/jobs/:jobId/fullcalendar",
            get(handlers::calendar::fullcalendar),
        );

    routes
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}
