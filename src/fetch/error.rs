//! Error types for the fetch pipeline.
//!
//! These never cross the batch driver boundary: the transfer orchestrator
//! converts them into [`TransferOutcome::Failed`](super::TransferOutcome::Failed).

use std::path::PathBuf;

use thiserror::Error;

use crate::drive::StoreError;

/// Errors raised while transferring a single file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Local filesystem error (create directory, create file, write, rename).
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The remote store failed (listing, metadata, media stream).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The written file was missing or empty after the transfer.
    #[error("empty or missing after transfer: {path}")]
    Verification {
        /// Destination that failed verification.
        path: PathBuf,
    },
}

impl FetchError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a verification error.
    pub fn verification(path: impl Into<PathBuf>) -> Self {
        Self::Verification { path: path.into() }
    }
}
