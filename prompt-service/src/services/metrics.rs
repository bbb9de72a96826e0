use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once, from `main`.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    if METRICS_HANDLE.set(handle).is_err() {
        anyhow::bail!("metrics recorder already initialized");
    }

    Ok(())
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count a finished relay request by outcome (`success`, `unauthorized`, ...).
pub fn record_outcome(outcome: &'static str) {
    metrics::counter!("prompt_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_latency(upstream: &'static str, elapsed: Duration) {
    metrics::histogram!("upstream_request_duration_seconds", "upstream" => upstream)
        .record(elapsed.as_secs_f64());
}
