//! Request executor: one dispatch, one classified settlement.

use super::endpoint::{EndpointResponse, SampleEndpoint};
use super::error::EndpointError;
use super::store::StoreHandle;
use super::types::{LogEntry, RequestOutcome};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// A dispatched request that has not necessarily settled yet.
#[derive(Debug)]
pub struct InFlight {
    pub id: Uuid,
    pub handle: JoinHandle<RequestOutcome>,
}

/// Fires requests at the endpoint and reports them to the store.
#[derive(Clone)]
pub struct RequestExecutor {
    endpoint: Arc<dyn SampleEndpoint>,
    store: StoreHandle,
}

impl RequestExecutor {
    pub fn new(endpoint: Arc<dyn SampleEndpoint>, store: StoreHandle) -> Self {
        Self { endpoint, store }
    }

    pub fn endpoint(&self) -> &Arc<dyn SampleEndpoint> {
        &self.endpoint
    }

    /// Record a pending entry, then run the request on its own task.
    ///
    /// The pending entry is enqueued before this returns, so log order follows
    /// dispatch order. The request itself is fire-and-forget; awaiting the
    /// returned handle is optional.
    pub fn dispatch(&self) -> InFlight {
        let id = Uuid::new_v4();
        let started = Instant::now();
        let generation = self.store.dispatched(LogEntry::pending(id, Utc::now()));

        let endpoint = Arc::clone(&self.endpoint);
        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(endpoint.call())
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(EndpointError::Request(panic_message(panic))));
            let outcome = classify(result, round_millis(started.elapsed()));

            crate::metrics::record_request(&outcome);
            if outcome.success {
                tracing::debug!(
                    request_id = %id,
                    status_code = ?outcome.status_code,
                    latency_ms = outcome.latency_ms,
                    "Request succeeded"
                );
            } else {
                tracing::warn!(
                    request_id = %id,
                    status_code = ?outcome.status_code,
                    latency_ms = outcome.latency_ms,
                    error = %outcome.message,
                    "Request failed"
                );
            }

            store.settled(generation, id, outcome.clone());
            outcome
        });

        InFlight { id, handle }
    }
}

/// Turn a raw endpoint result into a settled outcome.
///
/// Any non-2xx status is an error even though the transport succeeded.
pub fn classify(result: Result<EndpointResponse, EndpointError>, latency_ms: u64) -> RequestOutcome {
    match result {
        Ok(response) if (200..300).contains(&response.status) => {
            RequestOutcome::success(response.status, success_message(&response), latency_ms)
        }
        Ok(response) => {
            RequestOutcome::error(Some(response.status), error_message(&response), latency_ms)
        }
        Err(e) => RequestOutcome::error(None, e.to_string(), latency_ms),
    }
}

/// Elapsed time rounded to the nearest millisecond.
pub fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}

fn success_message(response: &EndpointResponse) -> String {
    match response.body.as_ref().and_then(|body| body.get("id")) {
        Some(serde_json::Value::String(id)) => format!("created sample #{}", id),
        Some(id) => format!("created sample #{}", id),
        None => status_line(response.status),
    }
}

fn error_message(response: &EndpointResponse) -> String {
    let detail = response
        .body
        .as_ref()
        .and_then(|body| body.get("error"))
        .and_then(|error| error.as_str());

    match detail {
        Some(detail) => format!("HTTP {}: {}", status_line(response.status), detail),
        None => format!("HTTP {}", status_line(response.status)),
    }
}

fn status_line(status: u16) -> String {
    match reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
    {
        Some(reason) => format!("{} {}", status, reason),
        None => status.to_string(),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("request panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("request panicked: {}", message)
    } else {
        "request panicked".to_string()
    }
}
