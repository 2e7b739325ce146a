//! Error types for credential acquisition.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, refreshing, or acquiring OAuth credentials.
///
/// Any of these is fatal to a run: nothing is listed without a token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The client secret file does not exist.
    #[error("client secret file not found: {path} (download it from the Google Cloud console)")]
    ClientSecretMissing {
        /// Expected location of the client secret JSON.
        path: PathBuf,
    },

    /// The client secret file exists but is not a usable installed/web client.
    #[error("invalid client secret file {path}: {reason}")]
    ClientSecretInvalid {
        /// Location of the client secret JSON.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Filesystem error reading or writing credential files.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A credential file or token response could not be (de)serialized.
    #[error("invalid JSON in {context}: {source}")]
    Json {
        /// What was being parsed.
        context: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// Transport failure talking to the token endpoint.
    #[error("network error during {operation}: {source}")]
    Network {
        /// What was being attempted.
        operation: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The token endpoint rejected the request.
    #[error("token endpoint returned HTTP {status}: {body}")]
    TokenEndpoint {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The consent redirect was malformed or reported an error.
    #[error("authorization failed: {reason}")]
    Consent {
        /// Description from the redirect (or of the malformed request).
        reason: String,
    },

    /// The redirect's `state` did not match the one sent.
    #[error("authorization response state mismatch")]
    StateMismatch,

    /// No redirect arrived in time.
    #[error("timed out after {seconds}s waiting for browser authorization")]
    ConsentTimeout {
        /// How long we waited.
        seconds: u64,
    },
}

const MAX_BODY_CHARS: usize = 512;

impl AuthError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a JSON error.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Creates a network error.
    pub fn network(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            operation: operation.into(),
            source,
        }
    }

    /// Creates a token endpoint error, truncating long bodies.
    pub fn token_endpoint(status: u16, body: &str) -> Self {
        let body: String = body.trim().chars().take(MAX_BODY_CHARS).collect();
        Self::TokenEndpoint { status, body }
    }

    /// Creates a consent error.
    pub fn consent(reason: impl Into<String>) -> Self {
        Self::Consent {
            reason: reason.into(),
        }
    }

    /// Creates an invalid client secret error.
    pub fn client_secret_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ClientSecretInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
