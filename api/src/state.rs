// Shared application state for the API binary: a small bag of
// cheaply-cloneable handles injected into every handler via axum's `State`
// extractor. Repositories are constructed per-request from `db_pool`
// (itself a `Clone` wrapper around a pooled connection) via
// `JobRepository::new(state.db_pool.clone())`, rather than storing one
// long-lived repository instance.

use common::config::Settings;
use common::db::DbPool;
use common::submission::SubmissionFacade;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub submission: Arc<SubmissionFacade>,
    pub config: Arc<Settings>,
}

impl AppState {
    pub fn new(db_pool: DbPool, submission: Arc<SubmissionFacade>, config: Settings) -> Self {
        Self {
            db_pool,
            submission,
            config: Arc::new(config),
        }
    }
}
