//! Resilient API client with retry, backoff, and typed failures
//!
//! External calls are described by a `RequestDescriptor`, executed through a
//! `Transport`, and retried on transient failures (timeouts, connection
//! resets, 5xx, 429) with exponential backoff. Client errors other than 429
//! are permanent and surface immediately; exhausting the attempt budget
//! surfaces the last underlying failure.

pub mod transport;

pub use transport::{HttpTransport, RawResponse, Transport, TransportError};

use rand::Rng;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// HTTP method for a request descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A logical request to an upstream service
///
/// Parameters keep their insertion order for the wire, but the cache key
/// sorts them so identical logical requests share an entry regardless of
/// call order.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Request URL
    pub endpoint: String,
    /// Query parameters, in insertion order
    pub parameters: Vec<(String, String)>,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// JSON body for POST requests
    pub body: Option<Value>,
}

impl RequestDescriptor {
    /// Creates a GET descriptor for the given endpoint
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            endpoint: endpoint.into(),
            parameters: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a POST descriptor carrying a JSON body
    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            endpoint: endpoint.into(),
            parameters: Vec::new(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// Appends a query parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Appends a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Derives the stable cache key for this descriptor
    pub fn cache_key(&self) -> String {
        let params: Vec<(&str, &str)> = self
            .parameters
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        request_signature(&self.endpoint, &params)
    }
}

/// Derives a deterministic cache key from a logical request
///
/// Parameters are sorted by name before hashing, so two requests with the
/// same endpoint and parameter set produce the same key regardless of
/// insertion order.
pub fn request_signature(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    for (name, value) in sorted {
        hasher.update(b"\x1f");
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Immutable retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt budget, at least 1
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds
    pub base_delay_ms: u64,
    /// Cap on any single backoff delay, in milliseconds
    pub max_delay_ms: u64,
    /// Whether to randomize delays to avoid thundering-herd retries
    pub jitter: bool,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64, jitter: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms,
            jitter,
        }
    }

    /// Backoff delay after the given failed attempt (1-based)
    ///
    /// `min(base * 2^(attempt-1), max)`, plus up to one extra base delay of
    /// random jitter when enabled.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);

        let jitter_ms = if self.jitter {
            rand::thread_rng().gen_range(0..=self.base_delay_ms)
        } else {
            0
        };

        Duration::from_millis(delay_ms + jitter_ms)
    }
}

impl Default for RetryPolicy {
    /// Three attempts, 1s base delay capped at 10s, with jitter
    fn default() -> Self {
        Self::new(3, 1_000, 10_000, true)
    }
}

/// Failures surfaced by [`ApiClient::send`]
#[derive(Debug, Error)]
pub enum ApiError {
    /// Timeout, connection reset, or 5xx; expected to succeed on retry
    #[error("transient failure: {0}")]
    Transient(String),

    /// Upstream returned 429; retried, honoring a retry-after hint if given
    #[error("rate limited by upstream (retry-after hint: {retry_after:?})")]
    RateLimited {
        /// The upstream's retry-after hint, if present
        retry_after: Option<Duration>,
    },

    /// A 4xx other than 429; retrying the same request cannot succeed
    #[error("permanent request failure (HTTP {status}): {message}")]
    Permanent {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        message: String,
    },

    /// The attempt budget ran out; carries the last underlying failure
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// How many attempts were made
        attempts: u32,
        /// The failure from the final attempt
        last: Box<ApiError>,
    },
}

impl ApiError {
    /// Whether another attempt could succeed without changing the request
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transient(_) | ApiError::RateLimited { .. })
    }
}

/// A successful upstream response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code (2xx)
    pub status: u16,
    /// Response body text
    pub body: String,
}

impl ApiResponse {
    /// Parses the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Issues requests through a transport, retrying transient failures
#[derive(Debug, Clone)]
pub struct ApiClient<T: Transport = HttpTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl ApiClient<HttpTransport> {
    /// Creates a client over HTTP with the given policy and request timeout
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Self {
        Self::with_transport(HttpTransport::new(timeout), policy)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Creates a client over an arbitrary transport
    pub fn with_transport(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Sends a request, retrying transient failures up to the attempt budget
    ///
    /// Permanent failures (4xx other than 429) propagate immediately after a
    /// single attempt. On 429 the upstream's retry-after hint is honored when
    /// present; otherwise the backoff schedule applies.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(descriptor).await {
                Ok(response) => {
                    debug!(endpoint = %descriptor.endpoint, attempt, "request succeeded");
                    return Ok(response);
                }
                Err(error) if error.is_retryable() => {
                    let delay = match &error {
                        ApiError::RateLimited {
                            retry_after: Some(hint),
                        } => *hint,
                        _ => self.policy.delay_for_attempt(attempt),
                    };
                    warn!(
                        endpoint = %descriptor.endpoint,
                        attempt,
                        ?delay,
                        "attempt failed, backing off: {error}"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(error);
                }
                Err(error) => {
                    warn!(endpoint = %descriptor.endpoint, "permanent failure: {error}");
                    return Err(error);
                }
            }
        }

        Err(ApiError::RetriesExhausted {
            attempts: self.policy.max_attempts,
            last: Box::new(
                last_error.unwrap_or_else(|| ApiError::Transient("no attempts made".to_string())),
            ),
        })
    }

    /// Executes one attempt and classifies the outcome
    async fn attempt(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let raw = self
            .transport
            .execute(descriptor)
            .await
            .map_err(|e| ApiError::Transient(e.to_string()))?;

        match raw.status {
            200..=299 => Ok(ApiResponse {
                status: raw.status,
                body: raw.body,
            }),
            429 => Err(ApiError::RateLimited {
                retry_after: raw.retry_after.map(Duration::from_secs),
            }),
            400..=499 => Err(ApiError::Permanent {
                status: raw.status,
                message: raw.body,
            }),
            status => Err(ApiError::Transient(format!(
                "upstream returned HTTP {status}"
            ))),
        }
    }
}
