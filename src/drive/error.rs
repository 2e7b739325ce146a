//! Error types for remote store operations.

use thiserror::Error;

/// Errors that can occur while talking to the remote file store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error during {operation}: {source}")]
    Network {
        /// The store operation that failed (e.g. `list folder root`).
        operation: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout during {operation}")]
    Timeout {
        /// The store operation that timed out.
        operation: String,
    },

    /// The API answered with a non-success status.
    #[error("HTTP {status} during {operation}: {body}")]
    HttpStatus {
        /// The store operation that was rejected.
        operation: String,
        /// The HTTP status code.
        status: u16,
        /// Response body excerpt, usually a JSON error document.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response during {operation}: {message}")]
    Decode {
        /// The store operation whose response was malformed.
        operation: String,
        /// Decoder message.
        message: String,
    },

    /// The media stream broke off mid-transfer.
    #[error("stream error during {operation}: {message}")]
    Stream {
        /// The store operation whose body stream failed.
        operation: String,
        /// Description of the failure.
        message: String,
    },

    /// The configured API base URL cannot be used to build request URLs.
    #[error("invalid API URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },
}

/// Longest response body excerpt kept in [`StoreError::HttpStatus`].
const MAX_BODY_EXCERPT: usize = 512;

impl StoreError {
    /// Creates a network error, promoting timeouts to [`StoreError::Timeout`].
    pub fn network(operation: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                operation: operation.into(),
            }
        } else {
            Self::Network {
                operation: operation.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error with a bounded body excerpt.
    pub fn http_status(operation: impl Into<String>, status: u16, body: &str) -> Self {
        let body: String = body.trim().chars().take(MAX_BODY_EXCERPT).collect();
        Self::HttpStatus {
            operation: operation.into(),
            status,
            body,
        }
    }

    /// Creates a decode error.
    pub fn decode(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a stream error.
    pub fn stream(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the HTTP status code for API rejections.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
