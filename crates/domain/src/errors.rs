//! Error types used throughout the forwarder

use std::time::Duration;

use thiserror::Error;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, 403) - credentials are wrong, no retry
    Authentication,
    /// Rate limiting errors (429) - retry with backoff
    RateLimit,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except auth) and malformed payloads - non-retryable
    Client,
    /// Network/connection errors and timeouts - retryable
    Network,
    /// Configuration errors - non-retryable
    Config,
}

/// Transport-level errors raised by the source and sink adapters
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Authentication failed (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    /// HTTP 429; `retry_after` is the server's `Retry-After` hint when given.
    #[error("Rate limit exceeded: {body}")]
    RateLimit { body: String, retry_after: Option<Duration> },

    #[error("Server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Client error (HTTP {status}): {body}")]
    Client { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::Auth { status, body },
            429 => Self::RateLimit { body, retry_after: None },
            500..=599 => Self::Server { status, body },
            _ => Self::Client { status, body },
        }
    }

    /// Attach the server's requested wait to a rate-limit error.
    #[must_use]
    pub fn with_retry_after(self, delay: Option<Duration>) -> Self {
        match self {
            Self::RateLimit { body, .. } => Self::RateLimit { body, retry_after: delay },
            other => other,
        }
    }

    /// Wait requested by the server before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth { .. } => ApiErrorCategory::Authentication,
            Self::RateLimit { .. } => ApiErrorCategory::RateLimit,
            Self::Server { .. } => ApiErrorCategory::Server,
            Self::Client { .. } | Self::Payload(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Check if this error should be retried
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network
        )
    }
}

/// Main error type for the forwarder
#[derive(Debug, Error)]
pub enum ForwarderError {
    /// A record's identity cannot be derived from one of its key fields.
    #[error("Malformed record: field `{field}` {problem}")]
    MalformedRecord { field: &'static str, problem: &'static str },

    /// The source could not produce the window's pages.
    #[error("Source unavailable after {pages_fetched} page(s) and {attempts} attempt(s): {error}")]
    SourceUnavailable { pages_fetched: usize, attempts: u32, error: ApiError },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] ApiError),
}

impl ForwarderError {
    /// Configuration errors halt the process; everything else is isolated to a
    /// record, a batch, or a window.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Whether retrying the failed operation could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Delivery(err) => err.should_retry(),
            Self::SourceUnavailable { error, .. } => error.should_retry(),
            Self::MalformedRecord { .. } | Self::Configuration(_) => false,
        }
    }
}

/// Result type alias for forwarder operations
pub type Result<T> = std::result::Result<T, ForwarderError>;
