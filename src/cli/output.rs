//! Output formatting helpers for CLI commands

use crate::config::LoadgenConfig;
use crate::generator::{LogEntry, RequestStatus, Snapshot};
use chrono::{DateTime, Local};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;

/// How many recent failures the summary lists
const RECENT_ERRORS: usize = 5;

/// View model for a finished headless run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub target: String,
    pub method: String,
    pub interval_ms: u64,
    pub duration_secs: u64,
    pub total: u64,
    pub success: u64,
    pub error: u64,
    pub error_rate: String,
    pub avg_latency: String,
    /// Fastest and slowest latency in the chart window
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    /// Requests that had not settled when the run ended
    pub unsettled: usize,
    pub recent_errors: Vec<LogEntry>,
}

impl RunSummary {
    pub fn new(config: &LoadgenConfig, duration_secs: u64, snapshot: &Snapshot) -> Self {
        let latencies = snapshot.chart.iter().map(|p| p.latency_ms);
        let min_latency_ms = latencies.clone().reduce(f64::min);
        let max_latency_ms = latencies.reduce(f64::max);

        let mut recent_errors: Vec<LogEntry> = snapshot
            .logs
            .iter()
            .rev()
            .filter(|e| e.status == RequestStatus::Error)
            .take(RECENT_ERRORS)
            .cloned()
            .collect();
        recent_errors.reverse();

        Self {
            target: config.target.url(),
            method: config.target.method.to_string(),
            interval_ms: snapshot.run.interval_ms,
            duration_secs,
            total: snapshot.stats.total,
            success: snapshot.stats.success,
            error: snapshot.stats.error,
            error_rate: snapshot.derived.error_rate.clone(),
            avg_latency: snapshot.derived.avg_latency.clone(),
            min_latency_ms,
            max_latency_ms,
            unsettled: snapshot.in_flight,
            recent_errors,
        }
    }
}

/// Format a run summary as tables
pub fn format_summary_table(summary: &RunSummary) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Metric", "Value"]);

    let error_rate = format!("{}%", summary.error_rate);
    let error_rate = match summary.error_rate.parse::<f64>().unwrap_or(0.0) {
        r if r == 0.0 => error_rate.green().to_string(),
        r if r < 5.0 => error_rate.yellow().to_string(),
        _ => error_rate.red().to_string(),
    };

    let rows = vec![
        ("Target", format!("{} {}", summary.method, summary.target)),
        ("Interval", format!("{}ms", summary.interval_ms)),
        ("Duration", format!("{}s", summary.duration_secs)),
        ("Total", summary.total.to_string()),
        ("Success", summary.success.to_string().green().to_string()),
        ("Error", summary.error.to_string().red().to_string()),
        ("Error rate", error_rate),
        ("Avg latency", format!("{}ms", summary.avg_latency)),
        ("Min latency", format_latency(summary.min_latency_ms)),
        ("Max latency", format_latency(summary.max_latency_ms)),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    if summary.unsettled > 0 {
        table.add_row(vec![
            Cell::new("Unsettled"),
            Cell::new(summary.unsettled.to_string().yellow().to_string()),
        ]);
    }

    let mut output = table.to_string();

    if !summary.recent_errors.is_empty() {
        let mut errors = Table::new();
        errors.load_preset(UTF8_FULL);
        errors.set_content_arrangement(ContentArrangement::Dynamic);
        errors.set_header(vec!["Time", "Code", "Latency", "Message"]);
        for entry in &summary.recent_errors {
            errors.add_row(vec![
                Cell::new(format_time(&entry.timestamp)),
                Cell::new(
                    entry
                        .status_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::new(format_latency(entry.latency_ms.map(|ms| ms as f64))),
                Cell::new(&entry.message),
            ]);
        }
        output.push_str("\n\nRecent errors:\n");
        output.push_str(&errors.to_string());
    }

    output
}

/// Format a run summary as JSON
pub fn format_summary_json(summary: &RunSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

fn format_time(rfc3339: &str) -> String {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|_| rfc3339.to_string())
}

fn format_latency(latency_ms: Option<f64>) -> String {
    match latency_ms {
        Some(ms) => format!("{}ms", ms),
        None => "-".to_string(),
    }
}
