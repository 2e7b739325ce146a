//! drivefetch Core Library
//!
//! This library provides the core functionality for the drivefetch tool,
//! which copies audio files out of Google Drive folders into a local,
//! date-organized directory tree.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - OAuth2 installed-app credentials (load, refresh, consent, persist)
//! - [`config`] - Batch configuration values and defaults
//! - [`drive`] - Remote file store trait and the Drive v3 REST client
//! - [`fetch`] - Listing, filtering, transfer orchestration and the batch driver

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod drive;
pub mod fetch;
mod http;

// Re-export commonly used types
pub use auth::{AccessToken, AuthError, AuthSettings, OAuthProvider};
pub use config::{BatchConfig, EmptyFilterReport, ListingOptions};
pub use drive::{DriveClient, FilePage, FileRecord, FileStore, MediaStream, StoreError};
pub use fetch::{
    BatchResult, ExtensionSet, FetchError, TransferOutcome, TransferTarget, filter_by_extension,
    list_all, run_batch, sanitize, transfer,
};
