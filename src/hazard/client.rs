//! # Hazard Check Client
//!
//! Typed client for the external hazard classifier:
//! `GET {base_url}{path}?x=..&y=..` → `{"<field>": true|false}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{CheckError, CheckResult};

/// Hazard client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardClientConfig {
    /// Service root, e.g. `http://127.0.0.1:5000`
    pub base_url: String,

    /// Endpoint path (default: "/is_dangerous")
    #[serde(default = "default_path")]
    pub path: String,

    /// Boolean field in the JSON response (default: "dangerous")
    #[serde(default = "default_field")]
    pub field: String,

    /// Per-request timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_path() -> String {
    "/is_dangerous".to_string()
}

fn default_field() -> String {
    "dangerous".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl HazardClientConfig {
    /// Config for `base_url` with every other field defaulted
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: default_path(),
            field: default_field(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Full endpoint URL
    pub fn endpoint(&self) -> CheckResult<Url> {
        let raw = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        let url = Url::parse(&raw)
            .map_err(|e| CheckError::Config(format!("invalid hazard URL {:?}: {}", raw, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(CheckError::Config(format!(
                "unsupported hazard URL scheme: {}",
                other
            ))),
        }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Hazard classification of a coordinate
#[async_trait]
pub trait HazardCheck: Send + Sync {
    /// `Ok(true)` if `(x, y)` is currently hazardous
    async fn check(&self, x: f64, y: f64) -> CheckResult<bool>;
}

/// HTTP implementation of [`HazardCheck`]
///
/// The inner `reqwest::Client` pools connections and is shared by all
/// sweep workers.
#[derive(Debug, Clone)]
pub struct HttpHazardClient {
    client: Client,
    endpoint: Url,
    field: String,
    timeout_ms: u64,
}

impl HttpHazardClient {
    /// Build a client from configuration
    pub fn new(config: &HazardClientConfig) -> CheckResult<Self> {
        if config.timeout_ms == 0 {
            return Err(CheckError::Config("timeout_ms must be > 0".into()));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CheckError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint()?,
            field: config.field.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    /// Endpoint this client calls
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn map_request_error(&self, e: reqwest::Error) -> CheckError {
        if e.is_timeout() {
            CheckError::Timeout(self.timeout_ms)
        } else if e.is_decode() {
            CheckError::InvalidResponse(e.to_string())
        } else {
            CheckError::Transport(e.to_string())
        }
    }

    fn read_flag(&self, body: &Value) -> CheckResult<bool> {
        match body.get(&self.field) {
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(other) => Err(CheckError::InvalidResponse(format!(
                "field {:?} is not a boolean: {}",
                self.field, other
            ))),
            None => Err(CheckError::InvalidResponse(format!(
                "field {:?} missing from response",
                self.field
            ))),
        }
    }
}

#[async_trait]
impl HazardCheck for HttpHazardClient {
    async fn check(&self, x: f64, y: f64) -> CheckResult<bool> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("x", x), ("y", y)])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.map_request_error(e))?;

        self.read_flag(&body)
    }
}
