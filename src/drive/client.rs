//! Google Drive v3 REST client.
//!
//! This module provides [`DriveClient`], the [`FileStore`] implementation used
//! in production. Every request carries the bearer token obtained from the
//! credential provider; the token is not refreshed mid-run.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{FilePage, FileRecord, FileStore, MediaStream, StoreError};
use crate::http::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, build_streaming_client};

/// Production Drive v3 API endpoint.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Partial-response field mask for listings.
const LIST_FIELDS: &str =
    "nextPageToken, files(id, name, mimeType, size, createdTime, modifiedTime)";

/// Partial-response field mask for single-file metadata.
const FILE_FIELDS: &str = "id, name, mimeType, size, createdTime, modifiedTime";

/// HTTP client for the Drive v3 files API.
///
/// Created once per run and reused for all calls, taking advantage of
/// connection pooling.
#[derive(Debug, Clone)]
pub struct DriveClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl DriveClient {
    /// Creates a client against the production Drive endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Network`] if the HTTP client cannot be built.
    pub fn new(access_token: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_base_url(access_token, DRIVE_API_BASE)
    }

    /// Creates a client against a custom API base (emulators, proxies, tests).
    ///
    /// `base_url` must point at the `drive/v3` root, e.g.
    /// `http://127.0.0.1:8080/drive/v3`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidUrl`] for an unusable base URL and
    /// [`StoreError::Network`] if the HTTP client cannot be built.
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let parsed =
            Url::parse(&base_url).map_err(|_| StoreError::invalid_url(base_url.clone()))?;
        if parsed.cannot_be_a_base() {
            return Err(StoreError::invalid_url(base_url));
        }
        let client = streaming_client(Duration::from_secs(READ_TIMEOUT_SECS))?;
        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
        })
    }

    /// Replaces the idle-read timeout (default 5 minutes).
    ///
    /// The timeout bounds the pause between two reads, not the whole
    /// transfer, so large files of any duration still complete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Network`] if the HTTP client cannot be rebuilt.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Result<Self, StoreError> {
        self.client = streaming_client(read_timeout)?;
        Ok(self)
    }

    /// Returns the API base this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `{base}/files` or `{base}/files/{id}` with the id percent-encoded.
    fn files_url(&self, file_id: Option<&str>) -> Result<Url, StoreError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|_| StoreError::invalid_url(&self.base_url))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StoreError::invalid_url(&self.base_url))?;
            segments.pop_if_empty().push("files");
            if let Some(id) = file_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, StoreError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StoreError::network(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::http_status(operation, status.as_u16(), &body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: Url,
    ) -> Result<T, StoreError> {
        let response = self.send(operation, self.client.get(url)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::network(operation, e))?;
        serde_json::from_str(&body).map_err(|e| StoreError::decode(operation, e.to_string()))
    }
}

fn streaming_client(read_timeout: Duration) -> Result<Client, StoreError> {
    build_streaming_client(Duration::from_secs(CONNECT_TIMEOUT_SECS), read_timeout)
        .map_err(|e| StoreError::network("build HTTP client", e))
}

/// Builds the Drive search query for direct, non-trashed children of a folder.
pub(crate) fn children_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and trashed = false")
}

#[async_trait]
impl FileStore for DriveClient {
    #[instrument(skip(self))]
    async fn list_page(
        &self,
        folder_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FilePage, StoreError> {
        let operation = format!("list folder {folder_id}");
        let mut url = self.files_url(None)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("q", &children_query(folder_id))
                .append_pair("pageSize", &page_size.to_string())
                .append_pair("fields", LIST_FIELDS);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let page: FilePage = self.get_json(&operation, url).await?;
        debug!(
            files = page.files.len(),
            has_next = page.next_page_token.is_some(),
            "listed page"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn get_metadata(&self, file_id: &str) -> Result<FileRecord, StoreError> {
        let operation = format!("get metadata {file_id}");
        let mut url = self.files_url(Some(file_id))?;
        url.query_pairs_mut().append_pair("fields", FILE_FIELDS);
        self.get_json(&operation, url).await
    }

    #[instrument(skip(self))]
    async fn open_media(&self, file_id: &str) -> Result<MediaStream, StoreError> {
        let operation = format!("download {file_id}");
        let mut url = self.files_url(Some(file_id))?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self.send(&operation, self.client.get(url)).await?;
        let content_length = response.content_length();
        debug!(?content_length, "media stream opened");

        let chunks = response
            .bytes_stream()
            .map(move |chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| StoreError::stream(operation.clone(), e.to_string()))
            })
            .boxed();
        Ok(MediaStream::new(content_length, chunks))
    }

    #[instrument(skip(self))]
    async fn delete(&self, file_id: &str) -> Result<(), StoreError> {
        let operation = format!("delete {file_id}");
        let url = self.files_url(Some(file_id))?;
        self.send(&operation, self.client.delete(url)).await?;
        Ok(())
    }
}
