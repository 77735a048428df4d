//! Data model shared by the request loop, the state store, and renderers.

use super::store::StoreSnapshot;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest message kept on a log entry.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Scheduler state visible to controls and renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub is_running: bool,
    pub interval_ms: u64,
}

/// Lifecycle of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Success,
    Error,
}

impl RequestStatus {
    pub fn is_settled(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Label used for metrics and log fields
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

/// Cumulative counters for the current run.
///
/// Only settled requests are counted, so `total == success + error` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total: u64,
    pub success: u64,
    pub error: u64,
    pub total_latency_ms: u64,
}

impl AggregateStats {
    /// Fold one settled request into the counters.
    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.total += 1;
        if outcome.success {
            self.success += 1;
        } else {
            self.error += 1;
        }
        self.total_latency_ms = self.total_latency_ms.saturating_add(outcome.latency_ms);
    }

    /// Percentage of settled requests that failed, two decimals.
    ///
    /// ```
    /// use loadgen::generator::AggregateStats;
    ///
    /// let stats = AggregateStats { total: 3, success: 2, error: 1, total_latency_ms: 90 };
    /// assert_eq!(stats.error_rate(), "33.33");
    /// assert_eq!(AggregateStats::default().error_rate(), "0.00");
    /// ```
    pub fn error_rate(&self) -> String {
        if self.total == 0 {
            return "0.00".to_string();
        }
        format!("{:.2}", self.error as f64 / self.total as f64 * 100.0)
    }

    /// Mean latency of settled requests in milliseconds, two decimals.
    pub fn avg_latency(&self) -> String {
        if self.total == 0 {
            return "0.00".to_string();
        }
        format!("{:.2}", self.total_latency_ms as f64 / self.total as f64)
    }

    pub fn derived(&self) -> DerivedMetrics {
        DerivedMetrics {
            error_rate: self.error_rate(),
            avg_latency: self.avg_latency(),
        }
    }
}

/// Metrics computed from [`AggregateStats`] on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub error_rate: String,
    pub avg_latency: String,
}

/// One row of the request log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    /// RFC 3339 dispatch time
    pub timestamp: String,
    pub started_at_epoch_ms: i64,
    pub status: RequestStatus,
    pub status_code: Option<u16>,
    pub message: String,
    pub latency_ms: Option<u64>,
}

impl LogEntry {
    /// New entry for a request that has just been dispatched.
    pub fn pending(id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            timestamp: started_at.to_rfc3339(),
            started_at_epoch_ms: started_at.timestamp_millis(),
            status: RequestStatus::Pending,
            status_code: None,
            message: "pending".to_string(),
            latency_ms: None,
        }
    }

    /// Move a pending entry to its terminal state. Settled entries are left untouched.
    pub fn settle(&mut self, outcome: &RequestOutcome) -> bool {
        if self.status.is_settled() {
            return false;
        }
        self.status = outcome.status();
        self.status_code = outcome.status_code;
        self.message = outcome.message.clone();
        self.latency_ms = Some(outcome.latency_ms);
        true
    }
}

/// Latency sample plotted for a settled request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: String,
    pub latency_ms: f64,
}

impl ChartPoint {
    pub fn now(latency_ms: u64) -> Self {
        Self {
            time: Local::now().format("%H:%M:%S%.3f").to_string(),
            latency_ms: latency_ms as f64,
        }
    }
}

/// Classified result of one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub success: bool,
    pub status_code: Option<u16>,
    pub message: String,
    pub latency_ms: u64,
}

impl RequestOutcome {
    pub fn success(status_code: u16, message: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            message: truncate_message(message.into()),
            latency_ms,
        }
    }

    pub fn error(status_code: Option<u16>, message: impl Into<String>, latency_ms: u64) -> Self {
        let mut message = truncate_message(message.into());
        if message.trim().is_empty() {
            message = "request failed".to_string();
        }
        Self {
            success: false,
            status_code,
            message,
            latency_ms,
        }
    }

    pub fn status(&self) -> RequestStatus {
        if self.success {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }
}

/// Everything a renderer needs to draw the current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub run: RunState,
    pub stats: AggregateStats,
    pub derived: DerivedMetrics,
    /// Requests dispatched but not yet settled
    pub in_flight: usize,
    pub log_capacity: usize,
    pub chart_capacity: usize,
    pub logs: Vec<LogEntry>,
    pub chart: Vec<ChartPoint>,
    /// Store sequence number of the last change included
    pub seq: u64,
}

impl Snapshot {
    pub fn new(run: RunState, store: StoreSnapshot) -> Self {
        Self {
            run,
            stats: store.stats,
            derived: store.derived,
            in_flight: store.in_flight,
            log_capacity: store.log_capacity,
            chart_capacity: store.chart_capacity,
            logs: store.logs,
            chart: store.chart,
            seq: store.seq,
        }
    }
}

fn truncate_message(mut message: String) -> String {
    if message.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    message
}
