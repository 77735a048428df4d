//! # Sample Target
//!
//! A small in-memory REST service to point the load generator at.
//!
//! ## Endpoints
//!
//! - `GET /` - `Hello, World!`
//! - `GET /hostname` - `{"hostname": "..."}`
//! - `GET /sample` - All stored samples, oldest first
//! - `POST /sample` - Store `{"message": "..."}`, returns `201` with the new sample
//!
//! Invalid bodies get `400 {"error": "..."}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// A stored sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: u64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /sample`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSample {
    pub message: String,
}

/// In-memory sample storage.
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: DashMap<u64, Sample>,
    next_id: AtomicU64,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a message and return the created sample. Ids start at 1.
    pub fn insert(&self, message: String) -> Sample {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let sample = Sample {
            id,
            message,
            created_at: Utc::now(),
        };
        self.samples.insert(id, sample.clone());
        sample
    }

    /// All samples ordered by id.
    pub fn list(&self) -> Vec<Sample> {
        let mut samples: Vec<Sample> = self.samples.iter().map(|e| e.value().clone()).collect();
        samples.sort_by_key(|s| s.id);
        samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Create the sample target router.
pub fn create_target_router(store: Arc<SampleStore>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/hostname", get(hostname))
        .route("/sample", get(list_samples).post(create_sample))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn hello() -> &'static str {
    "Hello, World!"
}

async fn hostname() -> Response {
    match hostname::get() {
        Ok(name) => Json(json!({ "hostname": name.to_string_lossy() })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read hostname");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read hostname")
        }
    }
}

async fn list_samples(State(store): State<Arc<SampleStore>>) -> Json<Vec<Sample>> {
    Json(store.list())
}

async fn create_sample(
    State(store): State<Arc<SampleStore>>,
    payload: Result<Json<CreateSample>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.body_text()),
    };
    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message is required");
    }

    let sample = store.insert(request.message);
    tracing::debug!(id = sample.id, "Sample created");
    (StatusCode::CREATED, Json(sample)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_from_one() {
        let store = SampleStore::new();
        assert!(store.is_empty());
        assert_eq!(store.insert("a".to_string()).id, 1);
        assert_eq!(store.insert("b".to_string()).id, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let store = SampleStore::new();
        for i in 0..20 {
            store.insert(format!("message {}", i));
        }
        let ids: Vec<u64> = store.list().iter().map(|s| s.id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_serialization() {
        let store = SampleStore::new();
        let sample = store.insert("load test".to_string());
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["message"], "load test");
        assert!(json["created_at"].is_string());
    }
}
