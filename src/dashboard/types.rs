//! Type definitions for dashboard data structures

use serde::{Deserialize, Serialize};

/// WebSocket update message sent to dashboard clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardUpdate {
    /// Type of update
    pub update_type: UpdateType,
    /// JSON payload for the update
    pub data: serde_json::Value,
    /// Store sequence number, absent for updates not produced by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl DashboardUpdate {
    /// Tag the update with the store sequence number it brings a client to.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Whether a client already holding state up to `baseline` has seen this update.
    pub fn is_covered_by(&self, baseline: u64) -> bool {
        self.seq.is_some_and(|seq| seq <= baseline)
    }
}

/// Type of WebSocket update
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// Full state, sent when a client connects
    Snapshot,
    /// A pending log entry was appended
    RequestDispatched,
    /// A request settled; carries the updated entry, chart point, and stats
    RequestSettled,
    /// The request loop started, stopped, or changed interval
    RunState,
    /// Stats, logs, and chart were cleared
    Reset,
}
