// API binary: the Submission Facade's HTTP surface plus read-side Job Store
// and FullCalendar projections. Following the bootstrap-then-serve
// `main.rs` shape; unlike the worker this binary logs human-readable text
// (`init_human_tracing`) since it is the one meant for an operator's terminal.

use common::bootstrap;
use common::config::Settings;
use common::db::{JobRepository, WebhookRepository};
use common::queue::JobQueue;
use common::storage::BlobStore;
use common::submission::SubmissionFacade;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod handlers;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_human_tracing();

    info!("starting API server");

    let settings = Settings::load()?;
    settings.validate()?;
    common::telemetry::init_metrics(settings.observability.metrics_port)?;

    let db_pool = bootstrap::init_database_pool(&settings).await?;
    let nats_queue = bootstrap::init_nats_queue(&settings).await?;
    let blob_client = bootstrap::init_blob_store(&settings)?;

    let queue: Arc<dyn JobQueue> = Arc::new(nats_queue);
    let blob_store: Arc<dyn BlobStore> = Arc::new(blob_client);

    let job_repo = JobRepository::new(db_pool.clone());
    let webhook_repo = WebhookRepository::new(db_pool.clone());

    let submission = Arc::new(SubmissionFacade::new(
        blob_store,
        job_repo,
        webhook_repo,
        queue,
        settings.server.max_upload_bytes,
        settings.pipeline.max_retries,
    ));

    let state = AppState::new(db_pool.clone(), submission, settings.clone());
    let app = routes::create_router(state);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C signal"),
        _ = terminate => info!("received SIGTERM signal"),
    }

    info!("initiating graceful shutdown");
}
