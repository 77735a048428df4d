//! # Dashboard Service API
//!
//! HTTP endpoints for controlling the load generator and reading its state.
//!
//! ## Endpoints
//!
//! - `GET /` - Embedded dashboard page
//! - `GET /assets/*path` - Dashboard static assets
//! - `GET /ws` - WebSocket stream of [`DashboardUpdate`]s
//! - `GET /v1/state` - Full snapshot (run state, stats, logs, chart)
//! - `GET /v1/logs` - Request log window
//! - `POST /v1/control/start` / `POST /v1/control/stop`
//! - `PUT /v1/control/interval` - Change interval (409 while running)
//! - `POST /v1/control/reset` - Clear all state (409 while running)
//! - `GET /health` - Service health
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Example
//!
//! ```no_run
//! use loadgen::api::{AppState, create_router};
//! use loadgen::config::LoadgenConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoadgenConfig::default();
//! let state = Arc::new(AppState::from_config(Arc::new(config))?);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Rejected actions return a JSON envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "load generator is running; stop it first",
//!     "type": "invalid_request_error",
//!     "code": "generator_running"
//!   }
//! }
//! ```

mod control;
mod health;
pub mod types;

pub use types::*;

use crate::config::LoadgenConfig;
use crate::dashboard::types::DashboardUpdate;
use crate::generator::{EndpointError, HttpSampleEndpoint, LoadGenerator, SampleEndpoint};
use crate::metrics::PrometheusHandle;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;

/// Maximum request body size (64 KB).
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Dashboard update channel capacity. Slow clients past this lag and skip.
const WS_CHANNEL_CAPACITY: usize = 1024;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub generator: Arc<LoadGenerator>,
    pub config: Arc<LoadgenConfig>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    /// Fan-out of store and run-state changes to dashboard clients
    pub ws_broadcast: broadcast::Sender<DashboardUpdate>,
    pub prometheus_handle: PrometheusHandle,
}

impl AppState {
    /// Create application state driving `endpoint`.
    ///
    /// Spawns the state store, so must be called from within a tokio runtime.
    pub fn new(config: Arc<LoadgenConfig>, endpoint: Arc<dyn SampleEndpoint>) -> Self {
        let (ws_broadcast, _) = broadcast::channel(WS_CHANNEL_CAPACITY);
        let generator = Arc::new(LoadGenerator::spawn_with_broadcast(
            endpoint,
            &config.generator,
            ws_broadcast.clone(),
        ));

        Self {
            generator,
            config,
            start_time: Instant::now(),
            ws_broadcast,
            prometheus_handle: crate::metrics::metrics_handle(),
        }
    }

    /// Create application state targeting the configured HTTP endpoint.
    pub fn from_config(config: Arc<LoadgenConfig>) -> Result<Self, EndpointError> {
        let endpoint = HttpSampleEndpoint::new(&config.target)?;
        Ok(Self::new(config, Arc::new(endpoint)))
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::dashboard::dashboard_handler))
        .route("/assets/*path", get(crate::dashboard::assets_handler))
        .route("/ws", get(crate::dashboard::websocket_handler))
        .route("/v1/state", get(control::state))
        .route("/v1/logs", get(crate::dashboard::logs_handler))
        .route("/v1/control/start", post(control::start))
        .route("/v1/control/stop", post(control::stop))
        .route("/v1/control/interval", put(control::interval))
        .route("/v1/control/reset", post(control::reset))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .with_state(state)
}
