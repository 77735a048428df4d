//! WebSocket handler for real-time dashboard updates

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::api::AppState;
use crate::dashboard::types::{DashboardUpdate, UpdateType};
use crate::generator::{LoadGenerator, LogEntry, RunState, Settlement, Snapshot, StoreSnapshot};

/// Largest incremental update forwarded to a client. Snapshots and resets
/// always go out, since every later update builds on them.
const MAX_MESSAGE_BYTES: usize = 256 * 1024;

/// Handles WebSocket upgrade requests for dashboard real-time updates
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the snapshot so no update falls in between.
    // Updates the snapshot already contains are filtered by sequence number.
    let mut rx = state.ws_broadcast.subscribe();

    let mut baseline = match state.generator.snapshot().await {
        Ok(snapshot) => {
            let seq = snapshot.seq;
            if let Some(json) = encode(&create_snapshot_update(&snapshot)) {
                if sender.send(Message::Text(json)).await.is_err() {
                    return;
                }
            }
            seq
        }
        Err(e) => {
            tracing::error!("Failed to read initial snapshot: {}", e);
            return;
        }
    };

    // Spawn task to forward broadcast messages to WebSocket
    let generator = Arc::clone(&state.generator);
    let send_task = tokio::spawn(async move {
        while let Some(update) = next_update(&mut rx, &generator, &mut baseline).await {
            let Some(json) = encode(&update) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages (ping/pong, close)
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
}

/// Next update for a client whose view is current up to `baseline`.
///
/// Updates the client already holds are skipped. A receiver that lagged
/// behind the channel gets a fresh snapshot instead of the updates it lost.
/// Returns `None` once the channel or the store is closed.
pub async fn next_update(
    rx: &mut broadcast::Receiver<DashboardUpdate>,
    generator: &LoadGenerator,
    baseline: &mut u64,
) -> Option<DashboardUpdate> {
    loop {
        match rx.recv().await {
            Ok(update) => {
                if update.is_covered_by(*baseline) {
                    continue;
                }
                if let Some(seq) = update.seq {
                    *baseline = seq;
                }
                return Some(update);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Dashboard client lagging, resending snapshot");
                match generator.snapshot().await {
                    Ok(snapshot) => {
                        *baseline = snapshot.seq;
                        return Some(create_snapshot_update(&snapshot));
                    }
                    Err(e) => {
                        tracing::error!("Failed to read snapshot for lagging client: {}", e);
                        return None;
                    }
                }
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

fn encode(update: &DashboardUpdate) -> Option<String> {
    let baseline = matches!(update.update_type, UpdateType::Snapshot | UpdateType::Reset);
    match serde_json::to_string(update) {
        Ok(json) if !baseline && json.len() > MAX_MESSAGE_BYTES => {
            tracing::warn!(
                "WebSocket message exceeds {}B limit ({}B), skipping",
                MAX_MESSAGE_BYTES,
                json.len()
            );
            None
        }
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize WebSocket update: {}", e);
            None
        }
    }
}

fn update(update_type: UpdateType, data: serde_json::Result<serde_json::Value>) -> DashboardUpdate {
    DashboardUpdate {
        update_type,
        data: data.unwrap_or(serde_json::Value::Null),
        seq: None,
    }
}

/// Create a full snapshot message
pub fn create_snapshot_update(snapshot: &Snapshot) -> DashboardUpdate {
    update(UpdateType::Snapshot, serde_json::to_value(snapshot)).with_seq(snapshot.seq)
}

/// Create a pending-request message
pub fn create_request_dispatched_update(entry: &LogEntry) -> DashboardUpdate {
    update(UpdateType::RequestDispatched, serde_json::to_value(entry))
}

/// Create a settled-request message
pub fn create_request_settled_update(settlement: &Settlement) -> DashboardUpdate {
    update(UpdateType::RequestSettled, serde_json::to_value(settlement))
}

/// Create a run state message
pub fn create_run_state_update(run: RunState) -> DashboardUpdate {
    update(UpdateType::RunState, serde_json::to_value(run))
}

/// Create a reset message carrying the emptied store
pub fn create_reset_update(store: &StoreSnapshot) -> DashboardUpdate {
    update(UpdateType::Reset, serde_json::to_value(store))
}
