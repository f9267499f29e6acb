// Worker binary: drains the Job Queue and runs each job through
// preprocess -> orchestrate -> store. Uses a bootstrap-then-spawn-then-
// wait-for-signal main.rs shape shared with the api binary.

use common::bootstrap;
use common::config::Settings;
use common::db::{JobRepository, RetryLogRepository, TimetableRepository, WebhookRepository};
use common::extractors::{RegexStructuredExtractor, StubVisionExtractor};
use common::orchestrator::Orchestrator;
use common::preprocessor::{OcrEngine, StubOcrEngine};
use common::queue::JobQueue;
use common::storage::BlobStore;
use common::webhook::WebhookDeliverer;
use common::worker_pool::WorkerPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_json_tracing();

    let settings = Settings::load()?;
    settings.validate()?;
    common::telemetry::init_metrics(settings.observability.metrics_port)?;

    info!(
        worker_concurrency = settings.pipeline.worker_concurrency,
        "starting worker"
    );

    let db_pool = bootstrap::init_database_pool(&settings).await?;
    let nats_queue = bootstrap::init_nats_queue(&settings).await?;
    let blob_client = bootstrap::init_blob_store(&settings)?;

    let queue: Arc<dyn JobQueue> = Arc::new(nats_queue);
    let blob_store: Arc<dyn BlobStore> = Arc::new(blob_client);
    let ocr: Arc<dyn OcrEngine> = Arc::new(StubOcrEngine);

    let job_repo = JobRepository::new(db_pool.clone());
    let retry_log_repo = RetryLogRepository::new(db_pool.clone());
    let timetable_repo = TimetableRepository::new(db_pool.clone());
    let webhook_repo = WebhookRepository::new(db_pool.clone());
    let sweep_webhook_repo = WebhookRepository::new(db_pool.clone());

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(RegexStructuredExtractor),
        Arc::new(StubVisionExtractor),
        settings.pipeline.clone(),
    ));

    let webhook_timeout = Duration::from_secs(settings.pipeline.backend_timeout_secs);
    let webhook_deliverer = Arc::new(WebhookDeliverer::new(webhook_repo, webhook_timeout));
    let sweep_deliverer = Arc::new(WebhookDeliverer::new(sweep_webhook_repo, webhook_timeout));

    let pool = Arc::new(WorkerPool::new(
        Arc::clone(&queue),
        Arc::clone(&blob_store),
        job_repo,
        retry_log_repo,
        timetable_repo,
        WebhookRepository::new(db_pool.clone()),
        orchestrator,
        webhook_deliverer,
        ocr,
        settings.pipeline.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let drainer_handles = pool.spawn(shutdown_rx);

    let sweep_handle = tokio::spawn({
        let deliverer = Arc::clone(&sweep_deliverer);
        let mut shutdown_rx = shutdown_tx.subscribe();
        async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = ticker.tick() => deliverer.sweep_pending(50).await,
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        }
    });

    wait_for_shutdown_signal().await?;
    info!("shutdown signal received, draining in-flight work");
    let _ = shutdown_tx.send(true);

    for handle in drainer_handles {
        let _ = handle.await;
    }
    let _ = sweep_handle.await;

    db_pool.close().await;
    info!("worker shut down cleanly");
    Ok(())
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}
