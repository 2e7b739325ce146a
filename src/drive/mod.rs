//! Remote file store abstraction and the Google Drive implementation.
//!
//! The fetch pipeline only talks to a [`FileStore`]; [`DriveClient`] is the
//! production implementation backed by the Drive v3 REST API.
//!
//! # Example
//!
//! ```no_run
//! use drivefetch_core::drive::{DriveClient, FileStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DriveClient::new("ya29.access-token")?;
//! let page = client.list_page("root", 1000, None).await?;
//! for file in &page.files {
//!     println!("{} ({})", file.name, file.id);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod record;

pub use client::{DRIVE_API_BASE, DriveClient};
pub use error::StoreError;
pub use record::{FilePage, FileRecord};

use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Chunked media body returned by [`FileStore::open_media`].
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, StoreError>>;

/// An open media download: the byte chunks plus the size when the store reports one.
pub struct MediaStream {
    /// Total body size in bytes, when known up front.
    pub content_length: Option<u64>,
    /// Body chunks in order.
    pub chunks: ChunkStream,
}

impl MediaStream {
    /// Wraps a chunk stream with an optional known length.
    #[must_use]
    pub fn new(content_length: Option<u64>, chunks: ChunkStream) -> Self {
        Self {
            content_length,
            chunks,
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Capability the fetch pipeline needs from a remote object store.
///
/// # Object Safety
///
/// This trait uses `async_trait` so the batch driver can take `&dyn FileStore`,
/// which keeps test doubles and the real client interchangeable.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Lists one page of non-trashed files whose parent is `folder_id`.
    async fn list_page(
        &self,
        folder_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FilePage, StoreError>;

    /// Fetches the current metadata of a single file.
    async fn get_metadata(&self, file_id: &str) -> Result<FileRecord, StoreError>;

    /// Opens the media (content) stream of a file.
    async fn open_media(&self, file_id: &str) -> Result<MediaStream, StoreError>;

    /// Permanently deletes a file at the source.
    async fn delete(&self, file_id: &str) -> Result<(), StoreError>;
}
