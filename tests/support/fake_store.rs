//! In-memory `FileStore` with scripted failures and a call log.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use drivefetch_core::{FilePage, FileRecord, FileStore, MediaStream, StoreError};
use futures_util::StreamExt;
use futures_util::stream;

/// One observed store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List {
        folder: String,
        page_token: Option<String>,
    },
    Metadata(String),
    Media(String),
    Delete(String),
}

#[derive(Default)]
pub struct FakeStore {
    /// Pages per folder; page `i` is requested with token `p{i}` (first page without one).
    pages: HashMap<String, Vec<FilePage>>,
    failing_folders: HashSet<String>,
    /// Folder -> index of the page whose request fails.
    failing_pages: HashMap<String, usize>,
    media: HashMap<String, Vec<Vec<u8>>>,
    failing_media: HashSet<String>,
    /// Media that yields one chunk and then a stream error.
    broken_streams: HashSet<String>,
    metadata: HashMap<String, FileRecord>,
    failing_deletes: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `files` as a single page for `folder`.
    pub fn with_folder(self, folder: &str, files: Vec<FileRecord>) -> Self {
        self.with_pages(folder, vec![files])
    }

    /// Serves `pages` for `folder`, chained with `p1`, `p2`, ... tokens.
    pub fn with_pages(mut self, folder: &str, pages: Vec<Vec<FileRecord>>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(index, files)| {
                if index + 1 < count {
                    FilePage::with_next(files, format!("p{}", index + 1))
                } else {
                    FilePage::last(files)
                }
            })
            .collect();
        self.pages.insert(folder.to_string(), pages);
        self
    }

    pub fn with_failing_folder(mut self, folder: &str) -> Self {
        self.failing_folders.insert(folder.to_string());
        self
    }

    pub fn with_failing_page(mut self, folder: &str, page_index: usize) -> Self {
        self.failing_pages.insert(folder.to_string(), page_index);
        self
    }

    pub fn with_media(mut self, id: &str, content: &[u8]) -> Self {
        self.media.insert(id.to_string(), vec![content.to_vec()]);
        self
    }

    pub fn with_chunked_media(mut self, id: &str, chunks: Vec<Vec<u8>>) -> Self {
        self.media.insert(id.to_string(), chunks);
        self
    }

    pub fn with_failing_media(mut self, id: &str) -> Self {
        self.failing_media.insert(id.to_string());
        self
    }

    pub fn with_broken_stream(mut self, id: &str) -> Self {
        self.broken_streams.insert(id.to_string());
        self
    }

    pub fn with_metadata(mut self, record: FileRecord) -> Self {
        self.metadata.insert(record.id.clone(), record);
        self
    }

    pub fn with_failing_delete(mut self, id: &str) -> Self {
        self.failing_deletes.insert(id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn media_reads(&self, id: &str) -> usize {
        self.count(|call| matches!(call, Call::Media(x) if x == id))
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn page_index(token: Option<&str>) -> usize {
    token
        .and_then(|t| t.strip_prefix('p'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl FileStore for FakeStore {
    async fn list_page(
        &self,
        folder_id: &str,
        _page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FilePage, StoreError> {
        self.record(Call::List {
            folder: folder_id.to_string(),
            page_token: page_token.map(str::to_string),
        });
        let index = page_index(page_token);
        if self.failing_folders.contains(folder_id)
            || self.failing_pages.get(folder_id) == Some(&index)
        {
            return Err(StoreError::http_status(
                format!("list {folder_id}"),
                500,
                "backend error",
            ));
        }
        Ok(self
            .pages
            .get(folder_id)
            .and_then(|pages| pages.get(index))
            .cloned()
            .unwrap_or_else(|| FilePage::last(Vec::new())))
    }

    async fn get_metadata(&self, file_id: &str) -> Result<FileRecord, StoreError> {
        self.record(Call::Metadata(file_id.to_string()));
        self.metadata.get(file_id).cloned().ok_or_else(|| {
            StoreError::http_status(format!("get metadata {file_id}"), 404, "not found")
        })
    }

    async fn open_media(&self, file_id: &str) -> Result<MediaStream, StoreError> {
        self.record(Call::Media(file_id.to_string()));
        if self.failing_media.contains(file_id) {
            return Err(StoreError::http_status(
                format!("download {file_id}"),
                403,
                "download quota exceeded",
            ));
        }

        let chunks = self.media.get(file_id).cloned().unwrap_or_default();
        let total: u64 = chunks.iter().map(|c| c.len() as u64).sum();
        let mut items: Vec<Result<Vec<u8>, StoreError>> = chunks.into_iter().map(Ok).collect();
        if self.broken_streams.contains(file_id) {
            items.truncate(1);
            items.push(Err(StoreError::stream(
                format!("download {file_id}"),
                "connection reset",
            )));
        }
        Ok(MediaStream::new(Some(total), stream::iter(items).boxed()))
    }

    async fn delete(&self, file_id: &str) -> Result<(), StoreError> {
        self.record(Call::Delete(file_id.to_string()));
        if self.failing_deletes.contains(file_id) {
            return Err(StoreError::http_status(
                format!("delete {file_id}"),
                403,
                "insufficient permissions",
            ));
        }
        Ok(())
    }
}
