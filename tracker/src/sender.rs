//! HTTP transport for delivering events.
//!
//! Each event is posted as a single JSON document to the collection endpoint.
//! There is no buffering and no retry: one request per event, and the outcome
//! is classified into a [`TransportError`] for the caller to log or surface.
//!
//! # Example
//!
//! ```no_run
//! use simpleanalytics::sender::{HttpTransport, Transport, TransportConfig};
//! use simpleanalytics::types::{EventBuilder, EventKind};
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = HttpTransport::new(TransportConfig::default()).unwrap();
//!
//!     let event = EventBuilder::new(EventKind::Pageview, "example.com")
//!         .path("/home")
//!         .build();
//!
//!     transport.send(&event).await.unwrap();
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{Result, TrackerError};
use crate::types::Event;

/// Collection endpoint for events.
pub const DEFAULT_ENDPOINT: &str = "https://queue.simpleanalyticscdn.com/events";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while delivering an event.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be completed (DNS, connect, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The response did not carry a usable HTTP status.
    #[error("malformed response: status {0} is not a valid HTTP status")]
    MalformedResponse(u16),

    /// The endpoint answered with a status outside 200-299.
    #[error("unexpected HTTP status: {0}")]
    HttpStatus(u16),

    /// The event could not be encoded as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransportError {
    /// Returns the HTTP status code for `HttpStatus` errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }
}

/// Delivers events to the collection endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one event.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the event was not accepted.
    async fn send(&self, event: &Event) -> std::result::Result<(), TransportError>;
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Endpoint URL events are posted to.
    pub endpoint: String,

    /// Timeout for a single request.
    pub timeout: Duration,
}

impl TransportConfig {
    /// Creates a configuration for a custom endpoint with the default timeout.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// [`Transport`] posting JSON over HTTPS with reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Url,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::InvalidEndpoint` if the endpoint is not an
    /// absolute http(s) URL, or `TrackerError::Client` if the HTTP client
    /// cannot be initialized.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let endpoint = parse_endpoint(&config.endpoint)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(TrackerError::Client)?;

        Ok(Self { endpoint, client })
    }

    /// Returns the endpoint events are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, event: &Event) -> std::result::Result<(), TransportError> {
        let body = serde_json::to_string(event)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(
            url = %self.endpoint,
            event = %event.event,
            "Sending event"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Connection error while sending event");
                TransportError::Network(e)
            })?;

        classify_status(response.status())?;

        info!(event = %event.event, path = ?event.path, "Event sent successfully");
        Ok(())
    }
}

/// Maps a response status to the send outcome.
fn classify_status(status: StatusCode) -> std::result::Result<(), TransportError> {
    let code = status.as_u16();
    if !(100..=599).contains(&code) {
        return Err(TransportError::MalformedResponse(code));
    }
    if !status.is_success() {
        warn!(status = code, "Collection endpoint rejected event");
        return Err(TransportError::HttpStatus(code));
    }
    Ok(())
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let invalid = |reason: String| TrackerError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid("missing host".to_string())),
        scheme => Err(invalid(format!("unsupported scheme '{scheme}'"))),
    }
}
