//! Metrics collection and Prometheus export.
//!
//! Domain counters are recorded through the `metrics` facade, the same one
//! the shared HTTP middleware uses, so a single recorder renders both.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Safe to call more than once; only the first call installs a recorder.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
            tracing::info!("Prometheus metrics initialized");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Metrics recorder already installed");
        }
    }
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record a completed turn.
pub fn record_turn(strategy: &str, source: &str, phase: &str) {
    counter!(
        "coach_turns_total",
        "strategy" => strategy.to_string(),
        "source" => source.to_string(),
        "phase" => phase.to_string()
    )
    .increment(1);
}

/// Record a strategy falling back to the keyword rules.
pub fn record_fallback(reason: &str) {
    counter!("coach_fallbacks_total", "reason" => reason.to_string()).increment(1);
}

/// Record a cluster model (re)fit.
pub fn record_cluster_fit() {
    counter!("coach_cluster_fits_total").increment(1);
}

/// Record a call to the text-generation backend.
pub fn record_generation(provider: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("provider", provider.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!("coach_generation_requests_total", &labels).increment(1);
    histogram!("coach_generation_duration_seconds", &labels).record(duration_secs);
}

/// Record database operation duration.
pub fn record_db_operation(operation: &str, duration_secs: f64) {
    histogram!("db_operation_duration_seconds", "operation" => operation.to_string())
        .record(duration_secs);
}

/// Record a database error.
pub fn record_db_error(operation: &str) {
    counter!("db_errors_total", "operation" => operation.to_string()).increment(1);
}
