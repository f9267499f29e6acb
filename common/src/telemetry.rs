// Metrics for the extraction pipeline, Prometheus wiring only (OpenTelemetry/
// OTLP tracing is dropped, this repo has no distributed-tracing backend to
// export to, see DESIGN.md).

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use uuid::Uuid;

/// Install the Prometheus exporter and describe every metric this pipeline
/// emits.
#[tracing::instrument(skip_all)]
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{metrics_port}")
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics port: {e}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "extraction_jobs_completed_total",
        "Total number of jobs that reached Completed"
    );
    describe_counter!(
        "extraction_jobs_failed_total",
        "Total number of jobs that reached Failed"
    );
    describe_histogram!(
        "extraction_backend_duration_seconds",
        "Time spent in an extraction backend call, by backend"
    );
    describe_gauge!(
        "extraction_queue_depth",
        "Approximate number of messages waiting in the job queue"
    );
    describe_counter!(
        "extraction_retries_total",
        "Total number of retry attempts recorded"
    );
    describe_counter!(
        "extraction_dlq_total",
        "Total number of jobs moved to the dead-letter queue"
    );

    tracing::info!(metrics_port, "Prometheus metrics exporter initialized");
    Ok(())
}

#[inline]
pub fn record_job_completed(job_id: &Uuid, method: &str) {
    counter!(
        "extraction_jobs_completed_total",
        "job_id" => job_id.to_string(),
        "method" => method.to_string()
    )
    .increment(1);
}

#[inline]
pub fn record_job_failed(job_id: &Uuid, error_kind: &str) {
    counter!(
        "extraction_jobs_failed_total",
        "job_id" => job_id.to_string(),
        "error_kind" => error_kind.to_string()
    )
    .increment(1);
}

#[inline]
pub fn record_backend_duration(backend: &str, duration_seconds: f64) {
    histogram!(
        "extraction_backend_duration_seconds",
        "backend" => backend.to_string()
    )
    .record(duration_seconds);
}

#[inline]
pub fn update_queue_depth(depth: i64) {
    gauge!("extraction_queue_depth").set(depth as f64);
}

#[inline]
pub fn record_retry(job_id: &Uuid) {
    counter!("extraction_retries_total", "job_id" => job_id.to_string()).increment(1);
}

#[inline]
pub fn record_dlq(job_id: &Uuid) {
    counter!("extraction_dlq_total", "job_id" => job_id.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_recording_does_not_panic() {
        let job_id = Uuid::new_v4();
        record_job_completed(&job_id, "structured");
        record_job_failed(&job_id, "ocr_error");
        record_backend_duration("vision", 1.5);
        update_queue_depth(10);
        record_retry(&job_id);
        record_dlq(&job_id);
    }
}
