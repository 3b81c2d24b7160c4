//! Prometheus metrics registry: prediction latency (histogram, label
//! variant), request/error counters, uptime gauge (spec §4.9).

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

pub fn install() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("install prometheus recorder")
}

pub fn record_request(route: &'static str) {
    metrics::counter!("rec_http_requests_total", "route" => route).increment(1);
}

pub fn record_error(route: &'static str, category: &'static str) {
    metrics::counter!("rec_http_errors_total", "route" => route, "category" => category).increment(1);
}

pub fn record_prediction_latency(variant: &'static str, latency_ms: f64) {
    metrics::histogram!("rec_prediction_latency_ms", "variant" => variant).record(latency_ms);
}

pub fn record_uptime(started_at: Instant) {
    metrics::gauge!("rec_server_uptime_seconds").set(started_at.elapsed().as_secs_f64());
}
