//! Prometheus metrics

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global recorder and describe the metrics we emit
pub fn install() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "pawprint_requests_total",
        "Prediction requests by outcome"
    );
    metrics::describe_counter!(
        "pawprint_predictions_total",
        "Successful predictions by class label"
    );
    metrics::describe_histogram!(
        "pawprint_inference_latency_us",
        metrics::Unit::Microseconds,
        "Decode plus forward pass latency in microseconds"
    );
    metrics::describe_gauge!("pawprint_model_ready", "1 when the model is loaded");

    info!("Metrics exporter initialized");
    Ok(handle)
}

pub fn record_request(outcome: &'static str) {
    metrics::counter!("pawprint_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_prediction(label: &str, latency_us: u64) {
    metrics::counter!("pawprint_predictions_total", "label" => label.to_string()).increment(1);
    metrics::histogram!("pawprint_inference_latency_us").record(latency_us as f64);
}

pub fn record_model_ready(ready: bool) {
    metrics::gauge!("pawprint_model_ready").set(if ready { 1.0 } else { 0.0 });
}
