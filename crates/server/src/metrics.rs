//! Prometheus metrics
//!
//! Recorder installation plus the small set of helpers the rest of the
//! server records through. The helpers are safe to call before the recorder
//! is installed (they become no-ops), which keeps tests free of global
//! setup.

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use parla_core::ErrorCategory;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    register_default_metrics();

    METRICS_HANDLE.get_or_init(|| handle.clone());
    handle
}

fn register_default_metrics() {
    gauge!("parla_sessions_active").set(0.0);
    counter!("parla_ws_connections_total").absolute(0);
    counter!("parla_turns_total").absolute(0);
    counter!("parla_stream_stalls_total").absolute(0);
    histogram!("parla_turn_duration_seconds").record(0.0);

    for category in ErrorCategory::ALL {
        counter!("parla_errors_total", "category" => category.as_str()).absolute(0);
    }
}

pub fn record_ws_connection() {
    counter!("parla_ws_connections_total").increment(1);
}

pub fn record_turn() {
    counter!("parla_turns_total").increment(1);
}

pub fn record_turn_duration(duration_secs: f64) {
    histogram!("parla_turn_duration_seconds").record(duration_secs);
}

pub fn record_error(category: ErrorCategory) {
    counter!("parla_errors_total", "category" => category.as_str()).increment(1);
}

pub fn record_stream_stall() {
    counter!("parla_stream_stalls_total").increment(1);
}

pub fn record_active_sessions(count: usize) {
    gauge!("parla_sessions_active").set(count as f64);
}

/// Prometheus-formatted metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    match METRICS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "metrics not initialized".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_do_not_panic_without_recorder() {
        record_ws_connection();
        record_turn();
        record_turn_duration(0.25);
        record_error(ErrorCategory::ProviderFailure);
        record_stream_stall();
        record_active_sessions(3);
    }
}
