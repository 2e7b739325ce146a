//! Shared HTTP client construction for the Drive API and OAuth token traffic.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

/// Default HTTP connect timeout (30 seconds).
pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Longest pause between two reads of a response (5 minutes).
pub(crate) const READ_TIMEOUT_SECS: u64 = 300;

/// Total time allowed for a short request/response exchange (OAuth token calls).
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 60;

/// User-Agent sent with every request (identifies the tool and version).
#[must_use]
pub(crate) fn user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("drivefetch/{version}")
}

fn base_builder(connect_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .gzip(true)
        .user_agent(user_agent())
}

/// Builds the client for streaming API traffic.
///
/// Only idle time between reads is bounded, so a long download that keeps
/// receiving bytes is never cut off.
pub(crate) fn build_streaming_client(
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    base_builder(connect_timeout)
        .read_timeout(read_timeout)
        .build()
}

/// Builds a client whose requests must finish within `request_timeout`.
pub(crate) fn build_request_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    base_builder(connect_timeout)
        .timeout(request_timeout)
        .build()
}
