//! Error types for Slack Plus

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Result type alias for Slack Plus
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable error code the Web API uses for rate-limited calls.
pub const RATE_LIMITED: &str = "ratelimited";

/// Slack Plus errors
#[derive(Error, Debug)]
pub enum Error {
    /// Feature identifier not registered and not a custom transform
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Feature name registered twice
    #[error("Feature already registered: {0}")]
    DuplicateFeature(String),

    /// A paginated endpoint returned a page without its result field
    #[error("Page from '{endpoint}' has no '{field}' field")]
    MissingPageField {
        /// Endpoint that produced the page
        endpoint: String,
        /// Configured result field
        field: String,
    },

    /// Upstream API failure, propagated unchanged
    #[error("Slack API error: {0}")]
    Api(#[from] ApiError),

    /// Rate-limit retries hit a configured cap
    #[error("Rate limit retries exhausted after {attempts} attempts ({waited:?} waited)")]
    RetryBudgetExhausted {
        /// Attempts made, including the first call
        attempts: u32,
        /// Total time spent waiting
        waited: Duration,
        /// Last rate-limit error returned by the API
        #[source]
        source: ApiError,
    },

    /// No method with this name on the assembled client
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Call arguments do not fit the method
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Response did not follow the expected protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Upstream error code, if this error came from the API
    #[must_use]
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api(e) | Self::RetryBudgetExhausted { source: e, .. } => Some(&e.code),
            _ => None,
        }
    }
}

/// A failed Web API call as surfaced by the transport.
///
/// Header names are stored lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// API method that failed (e.g. `conversations.history`)
    pub method: String,
    /// Machine-readable error code (the `error` field of the response)
    pub code: String,
    /// HTTP status
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Raw response body
    pub body: Value,
}

impl ApiError {
    /// Create an error with status 200 and no headers
    pub fn new(method: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            code: code.into(),
            status: 200,
            headers: HashMap::new(),
            body: Value::Null,
        }
    }

    /// Set the HTTP status
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a response header
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set the raw response body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Case-insensitive header lookup
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the API rejected the call for exceeding its rate limit
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.code == RATE_LIMITED
    }

    /// Server-specified wait from the `Retry-After` header (whole seconds)
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {} (HTTP {})", self.method, self.code, self.status)
    }
}

impl std::error::Error for ApiError {}
