//! HTTP transport seam for the vision endpoint.
//!
//! The orchestrator only needs "POST this JSON, give me status + body".
//! Keeping that behind a trait lets the retry loop run against a scripted
//! transport in tests.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::error;

/// Raw answer from the endpoint: status code plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// The request never produced an HTTP response (DNS, TLS, timeout, reset...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait Transport: Send + Sync {
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// reqwest-backed transport used by the binary.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Arogya/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }
}

impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        // The URL carries the API key, so reqwest errors are stripped of it
        // before they reach any log line or user-facing message.
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let msg = if e.is_timeout() {
                    format!("Request timed out after {}s", self.timeout.as_secs())
                } else {
                    format!("Request failed: {}", e.without_url())
                };
                error!("{}", msg);
                TransportError::new(msg)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            let msg = format!("Failed to read response body: {}", e.without_url());
            error!("{}", msg);
            TransportError::new(msg)
        })?;

        Ok(TransportResponse { status, body })
    }
}
