//! Error types for configuration, upstream polling, persistence and delivery.
//!
//! Only [`ConfigError`] is fatal, and only at startup. Every other error is
//! contained within the poll or delivery that produced it.

use std::fmt;
use std::time::Duration;

/// Maximum number of characters of an upstream error body kept for logs
/// and diagnostics.
pub const BODY_EXCERPT_LIMIT: usize = 500;

/// Startup configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    #[error("environment variable {key} is not set. {hint}")]
    Missing {
        /// Variable name.
        key: &'static str,
        /// Where the operator can obtain the value.
        hint: &'static str,
    },

    /// A variable is present but its value cannot be used.
    #[error("environment variable {key} is invalid: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Coarse classification of an upstream HTTP failure by status band.
///
/// These are hints only: the upstream's exact status semantics are not
/// under our control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// 4xx other than 429: request parameters were probably rejected.
    BadRequest,
    /// 429: polling too frequently.
    RateLimited,
    /// 5xx: transient upstream fault.
    ServerFault,
    /// Transport, parse or unexpected status.
    Other,
}

impl FailureClass {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            400..=499 => Self::BadRequest,
            500..=599 => Self::ServerFault,
            _ => Self::Other,
        }
    }

    /// Operator-facing guidance for this class.
    #[must_use]
    pub const fn hint(self) -> &'static str {
        match self {
            Self::BadRequest => "GA_CID, DOMAIN or the request payload do not match what the upstream expects.",
            Self::RateLimited => "polling too often, raise INTERVAL_MS.",
            Self::ServerFault => "the upstream server is failing, try again later.",
            Self::Other => "unexpected failure, see the error text above.",
        }
    }
}

/// Failure while fetching or decoding the campaign document.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The endpoint answered with a non-success status.
    #[error("API error {status} {status_text} :: {body_excerpt}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase, empty when unknown.
        status_text: String,
        /// First [`BODY_EXCERPT_LIMIT`] characters of the body.
        body_excerpt: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body is not valid JSON.
    #[error("malformed response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// No complete response arrived within the fetch deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl UpstreamError {
    /// Builds a [`UpstreamError::Status`] from a raw body, truncating it.
    #[must_use]
    pub fn status(status: u16, status_text: impl Into<String>, body: &str) -> Self {
        Self::Status {
            status,
            status_text: status_text.into(),
            body_excerpt: excerpt(body, BODY_EXCERPT_LIMIT),
        }
    }

    /// Returns the HTTP status code, if the upstream answered at all.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Parse(_) | Self::Timeout(_) => None,
        }
    }

    /// Returns the status-band classification of this failure.
    #[must_use]
    pub const fn failure_class(&self) -> FailureClass {
        match self.status_code() {
            Some(status) => FailureClass::from_status(status),
            None => FailureClass::Other,
        }
    }
}

/// Failure while writing a persisted document.
///
/// Reads never fail: a missing or malformed document loads as its default.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Filesystem error.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// File being written.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The value could not be encoded as JSON.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure to deliver one message to one subscriber.
#[derive(Debug, thiserror::Error)]
#[error("delivery to {subscriber} failed: {reason}")]
pub struct DeliveryError {
    /// Target subscriber, rendered.
    pub subscriber: String,
    /// Transport-provided reason.
    pub reason: String,
}

impl DeliveryError {
    /// Creates a delivery error for `subscriber`.
    pub fn new(subscriber: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self {
            subscriber: subscriber.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Returns at most `limit` characters of `text`, never splitting a char.
fn excerpt(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
