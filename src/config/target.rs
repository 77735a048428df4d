//! Sample endpoint target configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// HTTP method used against the sample endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetMethod {
    /// `GET {path}`, the dashboard variant
    #[default]
    Get,
    /// `POST {path}` with a `{"message": ...}` JSON body
    Post,
}

impl FromStr for TargetMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "get" => Ok(TargetMethod::Get),
            "post" => Ok(TargetMethod::Post),
            _ => Err(format!("Invalid method: {} (expected get or post)", s)),
        }
    }
}

impl std::fmt::Display for TargetMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetMethod::Get => write!(f, "GET"),
            TargetMethod::Post => write!(f, "POST"),
        }
    }
}

/// Where and how requests are fired
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    pub path: String,
    pub method: TargetMethod,
    /// Body message sent with POST requests
    pub message: String,
    /// Per-request timeout. Unset means requests may take arbitrarily long.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl TargetConfig {
    /// Full URL of the sample endpoint
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: "/sample".to_string(),
            method: TargetMethod::Get,
            message: "load test".to_string(),
            timeout_ms: None,
        }
    }
}
