//! Start/stop, interval, and reset handlers.

use crate::api::{ApiError, AppState, IntervalRequest};
use crate::generator::{ControlError, RunState, Snapshot};
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /v1/state - Full snapshot.
pub async fn state(State(state): State<Arc<AppState>>) -> Result<Json<Snapshot>, ApiError> {
    let snapshot = state
        .generator
        .snapshot()
        .await
        .map_err(ControlError::from)?;
    Ok(Json(snapshot))
}

/// POST /v1/control/start
pub async fn start(State(state): State<Arc<AppState>>) -> Json<RunState> {
    Json(state.generator.start().await)
}

/// POST /v1/control/stop
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<RunState> {
    Json(state.generator.stop().await)
}

/// PUT /v1/control/interval - Rejected while running.
pub async fn interval(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IntervalRequest>, JsonRejection>,
) -> Result<Json<RunState>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(&e.body_text()))?;
    let run = state.generator.set_interval(request.interval_ms).await?;
    Ok(Json(run))
}

/// POST /v1/control/reset - Rejected while running.
pub async fn reset(State(state): State<Arc<AppState>>) -> Result<Json<Snapshot>, ApiError> {
    state.generator.reset().await?;
    let snapshot = state
        .generator
        .snapshot()
        .await
        .map_err(ControlError::from)?;
    Ok(Json(snapshot))
}
