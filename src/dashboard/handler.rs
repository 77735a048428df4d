//! HTTP handlers for dashboard routes

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use rust_embed::RustEmbed;
use std::sync::Arc;

use crate::api::{ApiError, AppState};

/// Placeholder in index.html replaced with the initial snapshot
const INITIAL_DATA_PLACEHOLDER: &str = "/*INITIAL_DATA*/null";

/// Embedded dashboard assets from dashboard/ directory
#[derive(RustEmbed)]
#[folder = "dashboard/"]
struct DashboardAssets;

/// Serves the main dashboard HTML page with injected initial data
pub async fn dashboard_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(content) = DashboardAssets::get("index.html") else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Dashboard HTML not found").into_response();
    };

    let html = match std::str::from_utf8(&content.data) {
        Ok(html) => html,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid HTML encoding").into_response()
        }
    };

    let initial_data = match state.generator.snapshot().await {
        Ok(snapshot) => serde_json::to_string(&snapshot).unwrap_or_else(|_| "null".to_string()),
        Err(e) => {
            tracing::warn!("Dashboard rendered without initial data: {}", e);
            "null".to_string()
        }
    };

    Html(html.replace(INITIAL_DATA_PLACEHOLDER, &escape_script(&initial_data))).into_response()
}

/// Serves the request log (network inspector view)
pub async fn logs_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.generator.snapshot().await {
        Ok(snapshot) => axum::Json(snapshot.logs).into_response(),
        Err(e) => ApiError::from(crate::generator::ControlError::from(e)).into_response(),
    }
}

/// Serves static assets (CSS, JS, etc.)
pub async fn assets_handler(Path(path): Path<String>) -> Response {
    match DashboardAssets::get(&path) {
        Some(content) => {
            let mime_type = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime_type.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
    }
}

/// Keep JSON from closing the surrounding script element.
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/")
}
