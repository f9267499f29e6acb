// Shared binary init helpers, following the conventions of `bootstrap.rs`
// (eliminating duplication between the api and worker main.rs files).

use crate::config::Settings;
use crate::db::DbPool;
use crate::queue::NatsQueue;
use crate::storage::MinioClient;
use anyhow::{Context, Result};
use tracing::info;

#[tracing::instrument(skip(settings))]
pub async fn init_database_pool(settings: &Settings) -> Result<DbPool> {
    info!("initializing database pool");
    let pool = DbPool::new(&settings.database)
        .await
        .context("failed to initialize database pool")?;

    sqlx::migrate!("../migrations")
        .run(pool.pool())
        .await
        .context("failed to run database migrations")?;
    info!("database migrations applied");

    Ok(pool)
}

#[tracing::instrument(skip(settings))]
pub async fn init_nats_queue(settings: &Settings) -> Result<NatsQueue> {
    info!("initializing NATS job queue");
    let queue = NatsQueue::connect(
        settings.nats.clone(),
        settings.pipeline.visibility_timeout(),
    )
    .await
    .context("failed to initialize NATS job queue")?;
    Ok(queue)
}

#[tracing::instrument(skip(settings))]
pub fn init_blob_store(settings: &Settings) -> Result<MinioClient> {
    info!("initializing blob store client");
    let client = MinioClient::new(&settings.minio).context("failed to initialize blob store")?;
    Ok(client)
}

/// JSON structured logging, used by the worker binary.
pub fn init_json_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .json()
        .init();
}

/// Human-readable logging, used by the API binary in development.
pub fn init_human_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn module_compiles() {}
}
