//! Shared test utilities for load generator integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use loadgen::api::{create_router, AppState};
use loadgen::config::LoadgenConfig;
use loadgen::generator::{EndpointError, EndpointResponse, SampleEndpoint};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::Service;

// =============================================================================
// Endpoints
// =============================================================================

/// Endpoint that always answers with the same status after a fixed delay.
pub struct StaticEndpoint {
    pub status: u16,
    pub delay: Duration,
    pub calls: AtomicU64,
}

impl StaticEndpoint {
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            delay: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleEndpoint for StaticEndpoint {
    async fn call(&self) -> Result<EndpointResponse, EndpointError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(EndpointResponse {
            status: self.status,
            body: None,
        })
    }

    fn describe(&self) -> String {
        format!("GET static/{}", self.status)
    }
}

// =============================================================================
// App State Builders
// =============================================================================

/// Config with a short interval so tests see ticks quickly.
pub fn fast_config(interval_ms: u64) -> LoadgenConfig {
    let mut config = LoadgenConfig::default();
    config.generator.interval_ms = interval_ms;
    config
}

/// App state driving `endpoint`.
pub fn make_state(config: LoadgenConfig, endpoint: Arc<dyn SampleEndpoint>) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(config), endpoint))
}

/// App state with an instant 200 endpoint and a 1s interval.
pub fn default_state() -> Arc<AppState> {
    make_state(LoadgenConfig::default(), Arc::new(StaticEndpoint::ok()))
}

// =============================================================================
// HTTP Helpers
// =============================================================================

/// Send one request through a fresh router.
pub async fn send(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut app = create_router(Arc::clone(state));
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.call(request).await.unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
