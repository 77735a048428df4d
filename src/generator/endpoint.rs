//! The sample endpoint under load.

use super::error::EndpointError;
use crate::config::{TargetConfig, TargetMethod};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Status and best-effort JSON body of one response.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse {
    pub status: u16,
    /// `None` when the body is empty or not JSON
    pub body: Option<serde_json::Value>,
}

/// One fixed request against the external endpoint.
#[async_trait]
pub trait SampleEndpoint: Send + Sync {
    /// Perform a single request/response cycle.
    ///
    /// A non-2xx response is still `Ok`; only transport failures are errors.
    async fn call(&self) -> Result<EndpointResponse, EndpointError>;

    /// Human readable method and URL, e.g. `GET http://localhost:8080/sample`
    fn describe(&self) -> String;
}

#[derive(Serialize)]
struct SampleRequest<'a> {
    message: &'a str,
}

/// reqwest-backed endpoint built from [`TargetConfig`].
pub struct HttpSampleEndpoint {
    client: reqwest::Client,
    url: String,
    method: TargetMethod,
    message: String,
    timeout_ms: Option<u64>,
}

impl HttpSampleEndpoint {
    /// Create an endpoint with its own HTTP client.
    pub fn new(config: &TargetConfig) -> Result<Self, EndpointError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| EndpointError::Client(e.to_string()))?;
        Ok(Self::with_client(config, client))
    }

    /// Create an endpoint with a custom HTTP client (for testing).
    pub fn with_client(config: &TargetConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            url: config.url(),
            method: config.method,
            message: config.message.clone(),
            timeout_ms: config.timeout_ms,
        }
    }

    /// Classify reqwest error into EndpointError.
    fn classify_error(&self, e: reqwest::Error) -> EndpointError {
        if e.is_timeout() {
            EndpointError::Timeout(self.timeout_ms.unwrap_or_default())
        } else if e.is_connect() {
            EndpointError::ConnectionFailed(e.to_string())
        } else {
            EndpointError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl SampleEndpoint for HttpSampleEndpoint {
    async fn call(&self) -> Result<EndpointResponse, EndpointError> {
        let request = match self.method {
            TargetMethod::Get => self.client.get(&self.url),
            TargetMethod::Post => self.client.post(&self.url).json(&SampleRequest {
                message: &self.message,
            }),
        };

        let response = request.send().await.map_err(|e| self.classify_error(e))?;
        let status = response.status().as_u16();

        let body = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).ok(),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read response body");
                None
            }
        };

        Ok(EndpointResponse { status, body })
    }

    fn describe(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}
