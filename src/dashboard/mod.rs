//! Web dashboard module for real-time load monitoring
//!
//! Provides an embedded web dashboard served at `/` that displays:
//! - Start/stop, interval, and reset controls
//! - Aggregate counters, error rate, and average latency
//! - A rolling latency chart
//! - A network inspector table of recent requests
//!
//! Uses WebSocket for real-time updates with automatic fallback to polling.

pub mod handler;
pub mod types;
pub mod websocket;

pub use handler::{assets_handler, dashboard_handler, logs_handler};
pub use websocket::websocket_handler;
