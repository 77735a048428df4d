//! Error types for the load generator.

use thiserror::Error;

/// Rejected control actions. State is left unchanged whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The request loop is running; stop it first
    #[error("load generator is running; stop it first")]
    Running,

    /// Interval must be at least one millisecond
    #[error("invalid interval: {0}ms (must be at least 1ms)")]
    InvalidInterval(u64),

    /// The state store task has exited
    #[error(transparent)]
    StoreClosed(#[from] StoreClosed),
}

/// The state store task is no longer receiving commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("state store is closed")]
pub struct StoreClosed;

/// Transport-level failures talking to the sample endpoint.
#[derive(Debug, Clone, Error)]
pub enum EndpointError {
    /// Request timeout
    #[error("request timeout after {0}ms")]
    Timeout(u64),

    /// Connection failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Anything else reqwest reports (body, redirect, decode)
    #[error("request failed: {0}")]
    Request(String),

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
