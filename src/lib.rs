//! Periodic load generator with a real-time dashboard.
//!
//! The [`generator`] module fires one request per interval at a sample
//! endpoint and keeps rolling statistics; [`api`] and [`dashboard`] expose
//! them over HTTP and WebSocket; [`target`] is a small service to aim at.

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod target;
