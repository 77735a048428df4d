//! Load generator configuration

use serde::{Deserialize, Serialize};

/// Default cap for the log and chart windows
pub const DEFAULT_WINDOW_CAPACITY: usize = 200;

/// Request loop and rolling window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Milliseconds between ticks
    pub interval_ms: u64,
    /// Most recent log entries kept
    pub log_capacity: usize,
    /// Most recent chart points kept
    pub chart_capacity: usize,
    /// Start firing as soon as the dashboard server is up
    pub autostart: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            log_capacity: DEFAULT_WINDOW_CAPACITY,
            chart_capacity: DEFAULT_WINDOW_CAPACITY,
            autostart: false,
        }
    }
}
