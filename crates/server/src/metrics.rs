//! Prometheus metrics

use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use textbook_chat_core::SubjectSelection;

use crate::state::AppState;

/// Install the global Prometheus recorder.
///
/// Returns `None` if a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

pub fn record_request(endpoint: &'static str) {
    metrics::counter!("textbook_chat_requests_total", "endpoint" => endpoint).increment(1);
}

pub fn record_turn_latency(elapsed: Duration) {
    metrics::histogram!("textbook_chat_turn_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_selection(selection: SubjectSelection) {
    metrics::counter!("textbook_chat_selections_total", "selection" => selection.as_str())
        .increment(1);
}

pub fn record_provider_error() {
    metrics::counter!("textbook_chat_provider_errors_total").increment(1);
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics are disabled".to_string()),
    }
}
