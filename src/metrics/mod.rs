//! # Metrics
//!
//! Prometheus instrumentation for the request loop, exported at `GET /metrics`.
//!
//! **Counters:**
//! - `loadgen_requests_total{status}` - Settled requests by outcome
//!
//! **Histograms:**
//! - `loadgen_request_duration_seconds{status}` - Request latency
//!
//! **Gauges:**
//! - `loadgen_running` - 1 while the request loop is running

pub mod handler;

pub use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::generator::RequestOutcome;

/// Initialize Prometheus metrics exporter with custom histogram buckets.
///
/// Buckets: [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1, 2.5, 5, 10] seconds.
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let duration_buckets = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("loadgen_request_duration_seconds".to_string()),
            duration_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Install the global recorder, or fall back to a detached handle if one is
/// already installed (e.g., in tests).
pub fn metrics_handle() -> PrometheusHandle {
    setup_metrics().unwrap_or_else(|e| {
        tracing::debug!("Metrics already initialized, creating new handle: {}", e);
        PrometheusBuilder::new().build_recorder().handle()
    })
}

/// Record one settled request.
pub fn record_request(outcome: &RequestOutcome) {
    let status = outcome.status().as_str();
    metrics::counter!("loadgen_requests_total", "status" => status).increment(1);
    metrics::histogram!("loadgen_request_duration_seconds", "status" => status)
        .record(outcome.latency_ms as f64 / 1000.0);
}

/// Track whether the request loop is running.
pub fn record_running(running: bool) {
    metrics::gauge!("loadgen_running").set(if running { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, Once};

    static INIT: Once = Once::new();
    static TEST_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

    fn get_test_handle() -> PrometheusHandle {
        INIT.call_once(|| {
            // Use build_recorder which doesn't need a runtime
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            *TEST_HANDLE.lock().unwrap() = Some(handle);
            metrics::set_global_recorder(Box::new(recorder)).ok();
        });

        TEST_HANDLE.lock().unwrap().as_ref().unwrap().clone()
    }

    #[test]
    fn test_record_request_counts_by_status() {
        let handle = get_test_handle();
        record_request(&RequestOutcome::success(200, "200 OK", 15));
        record_request(&RequestOutcome::error(Some(500), "HTTP 500", 30));

        let rendered = handle.render();
        assert!(rendered.contains("loadgen_requests_total"));
        assert!(rendered.contains("status=\"success\""));
        assert!(rendered.contains("status=\"error\""));
    }

    #[test]
    fn test_record_running_gauge() {
        let handle = get_test_handle();
        record_running(true);
        assert!(handle.render().contains("loadgen_running"));
    }
}
