//! HTTP transport behind the resilient API client
//!
//! The client retries against a `Transport`, a single-call seam that issues
//! one request attempt and reports what came back. The real backend wraps
//! `reqwest`; tests substitute a scripted transport.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::{Method, RequestDescriptor};

/// What one request attempt produced, before any retry classification
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed `Retry-After` header in seconds, if the upstream sent one
    pub retry_after: Option<u64>,
    /// Response body text
    pub body: String,
}

/// Failures below the HTTP layer: the request never produced a status code
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request exceeded the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection failed or was reset mid-request
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Issues a single request attempt for a descriptor
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes the request once, with a bounded timeout
    async fn execute(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, TransportError>;
}

/// Transport backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport applying the given per-request timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        let mut request = match descriptor.method {
            Method::Get => self.client.get(&descriptor.endpoint),
            Method::Post => self.client.post(&descriptor.endpoint),
        };

        if !descriptor.parameters.is_empty() {
            request = request.query(&descriptor.parameters);
        }
        for (name, value) in &descriptor.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }

        let response = request.timeout(self.timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        // Parse retry-after before consuming the body
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}
