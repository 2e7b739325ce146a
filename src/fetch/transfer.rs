//! Single-file transfer orchestration.
//!
//! One call to [`transfer`] moves one remote record into its date bucket:
//!
//! 1. sanitize the display name
//! 2. derive the bucket from the creation time (existing bucket, metadata
//!    lookup, or wall clock as fallbacks)
//! 3. skip if the destination file already exists
//! 4. stream the media into `<file>.part`, verify it is non-empty, rename it
//! 5. optionally delete the record at the source
//!
//! Every failure is returned as [`TransferOutcome::Failed`]; nothing propagates.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::paths::ensure_directory;
use super::{FetchError, sanitize};
use crate::drive::{FileRecord, FileStore, MediaStream};

/// `strftime` pattern of the date bucket prefix (`2024-01-02_030405`).
pub const BUCKET_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Suffix of the in-progress file next to the final destination.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Result of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// File written and verified (source deletion may or may not have happened).
    Success,
    /// Destination already existed; nothing was read or deleted.
    Skipped,
    /// Transfer failed; the message describes why.
    Failed(String),
}

impl TransferOutcome {
    /// Returns true for [`TransferOutcome::Success`] and [`TransferOutcome::Skipped`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Where a record lands on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTarget {
    /// The record being transferred.
    pub record: FileRecord,
    /// Formatted creation-time bucket.
    pub bucket: String,
    /// `<download_root>/<bucket>_<id>`.
    pub directory: PathBuf,
    /// `<directory>/<sanitized name>`.
    pub file: PathBuf,
    /// True when the bucket came from the wall clock rather than metadata.
    pub bucket_from_clock: bool,
}

impl TransferTarget {
    /// Derives directory and file paths for `record` in `bucket`.
    #[must_use]
    pub fn new(
        record: &FileRecord,
        bucket: impl Into<String>,
        download_root: &Path,
        bucket_from_clock: bool,
    ) -> Self {
        let bucket = bucket.into();
        let directory = download_root.join(bucket_directory_name(&bucket, &record.id));
        let file = directory.join(sanitize(&record.name));
        Self {
            record: record.clone(),
            bucket,
            directory,
            file,
            bucket_from_clock,
        }
    }

    /// Path of the in-progress download.
    #[must_use]
    pub fn partial_file(&self) -> PathBuf {
        let mut name = self.file.as_os_str().to_os_string();
        name.push(PARTIAL_SUFFIX);
        PathBuf::from(name)
    }

    /// `<bucket>_<id>/<file name>` for log lines.
    #[must_use]
    pub fn display_name(&self) -> String {
        let file_name = self
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "{}/{file_name}",
            bucket_directory_name(&self.bucket, &self.record.id)
        )
    }
}

fn bucket_directory_name(bucket: &str, id: &str) -> String {
    format!("{bucket}_{id}")
}

/// Formats an ISO-8601 timestamp as a bucket, or `None` if it cannot be parsed.
///
/// Timestamps with an offset are converted to UTC; naive timestamps are taken as-is.
#[must_use]
pub fn format_bucket(timestamp: &str) -> Option<String> {
    let timestamp = timestamp.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.with_timezone(&Utc).format(BUCKET_FORMAT).to_string());
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|parsed| parsed.format(BUCKET_FORMAT).to_string())
}

/// Transfers one record into `download_root`.
///
/// Never fails: transport, API, and filesystem errors become
/// [`TransferOutcome::Failed`]. Deletion at the source (when `delete_after`)
/// happens only after the written file has been verified non-empty, and a
/// failed deletion does not change the outcome.
#[instrument(skip(record, store, download_root), fields(file_id = %record.id, name = %record.name))]
pub async fn transfer(
    record: &FileRecord,
    store: &dyn FileStore,
    download_root: &Path,
    delete_after: bool,
) -> TransferOutcome {
    match transfer_inner(record, store, download_root, delete_after).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "transfer failed");
            TransferOutcome::Failed(e.to_string())
        }
    }
}

async fn transfer_inner(
    record: &FileRecord,
    store: &dyn FileStore,
    download_root: &Path,
    delete_after: bool,
) -> Result<TransferOutcome, FetchError> {
    let target = resolve_target(record, store, download_root).await;

    if tokio::fs::try_exists(&target.file).await.unwrap_or(false) {
        warn!(target = %target.display_name(), "file already exists, skipping");
        return Ok(TransferOutcome::Skipped);
    }

    info!(target = %target.display_name(), "downloading");
    ensure_directory(&target.directory).await?;

    let partial = target.partial_file();
    let bytes = match download_to(record, store, &partial).await {
        Ok(bytes) => bytes,
        Err(e) => {
            remove_quietly(&partial).await;
            return Err(e);
        }
    };

    if !is_non_empty_file(&partial).await {
        remove_quietly(&partial).await;
        return Err(FetchError::verification(&target.file));
    }

    if let Err(e) = tokio::fs::rename(&partial, &target.file).await {
        remove_quietly(&partial).await;
        return Err(FetchError::io(&target.file, e));
    }
    info!(target = %target.display_name(), bytes, "downloaded");

    if delete_after {
        delete_at_source(record, store).await;
    }

    Ok(TransferOutcome::Success)
}

/// Computes the destination, falling back through an existing bucket for the
/// same id (no network), fetched metadata, and finally the current local time.
async fn resolve_target(
    record: &FileRecord,
    store: &dyn FileStore,
    download_root: &Path,
) -> TransferTarget {
    if let Some(bucket) = record.created_time.as_deref().and_then(format_bucket) {
        debug!(bucket = %bucket, "bucket from listing timestamp");
        return TransferTarget::new(record, bucket, download_root, false);
    }

    let file_name = sanitize(&record.name);
    if let Some(bucket) = find_existing_bucket(download_root, &record.id, &file_name).await {
        debug!(bucket = %bucket, "reusing bucket from an earlier run");
        return TransferTarget::new(record, bucket, download_root, false);
    }

    match store.get_metadata(&record.id).await {
        Ok(metadata) => {
            if let Some(bucket) = metadata.created_time.as_deref().and_then(format_bucket) {
                debug!(bucket = %bucket, "bucket from fetched metadata");
                return TransferTarget::new(record, bucket, download_root, false);
            }
        }
        Err(e) => warn!(error = %e, "failed to fetch metadata for creation date"),
    }

    let bucket = Local::now().format(BUCKET_FORMAT).to_string();
    warn!(bucket = %bucket, "no creation date found, using current time");
    TransferTarget::new(record, bucket, download_root, true)
}

/// Finds a `<bucket>_<id>` directory under `download_root` that already holds `file_name`.
async fn find_existing_bucket(download_root: &Path, id: &str, file_name: &str) -> Option<String> {
    let mut entries = tokio::fs::read_dir(download_root).await.ok()?;
    let mut found: Vec<String> = Vec::new();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let dir_name = entry.file_name();
        let Some(dir_name) = dir_name.to_str() else {
            continue;
        };
        let Some(bucket) = dir_name
            .strip_suffix(id)
            .and_then(|prefix| prefix.strip_suffix('_'))
        else {
            continue;
        };
        if NaiveDateTime::parse_from_str(bucket, BUCKET_FORMAT).is_err() {
            continue;
        }
        if tokio::fs::try_exists(entry.path().join(file_name))
            .await
            .unwrap_or(false)
        {
            found.push(bucket.to_string());
        }
    }

    // Earliest bucket wins so repeated runs keep converging on the same directory.
    found.sort();
    found.into_iter().next()
}

async fn download_to(
    record: &FileRecord,
    store: &dyn FileStore,
    path: &Path,
) -> Result<u64, FetchError> {
    let media = store.open_media(&record.id).await?;
    let expected = record.size_bytes.or(media.content_length);
    if let Some(expected) = expected {
        debug!(expected_bytes = expected, "file size");
    }
    stream_to_file(media, path, expected).await
}

/// Streams the media chunks into `path`, returning bytes written.
async fn stream_to_file(
    media: MediaStream,
    path: &Path,
    expected: Option<u64>,
) -> Result<u64, FetchError> {
    let file = File::create(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut chunks = media.chunks;
    let mut bytes_written: u64 = 0;
    let mut last_reported_decile: u64 = 0;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        bytes_written += chunk.len() as u64;

        if let Some(total) = expected.filter(|total| *total > 0) {
            let percent = (bytes_written.saturating_mul(100) / total).min(100);
            let decile = percent / 10;
            if decile > last_reported_decile {
                last_reported_decile = decile;
                debug!(progress = percent, "download progress");
            }
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(path, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| FetchError::io(path, e))?;

    Ok(bytes_written)
}

async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed incomplete file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove incomplete file"),
    }
}

async fn delete_at_source(record: &FileRecord, store: &dyn FileStore) {
    debug!("deletion at source enabled");
    match store.delete(&record.id).await {
        Ok(()) => info!("deleted from source after successful download"),
        Err(e) => warn!(error = %e, "failed to delete from source; download still counts"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_bucket_utc() {
        assert_eq!(
            format_bucket("2024-01-02T03:04:05Z").as_deref(),
            Some("2024-01-02_030405")
        );
        assert_eq!(
            format_bucket("2024-01-02T03:04:05.123Z").as_deref(),
            Some("2024-01-02_030405")
        );
    }

    #[test]
    fn test_format_bucket_converts_offsets_to_utc() {
        assert_eq!(
            format_bucket("2024-01-02T05:04:05+02:00").as_deref(),
            Some("2024-01-02_030405")
        );
    }

    #[test]
    fn test_format_bucket_naive_timestamp() {
        assert_eq!(
            format_bucket("2024-06-30T23:59:58").as_deref(),
            Some("2024-06-30_235958")
        );
    }

    #[test]
    fn test_format_bucket_rejects_garbage() {
        assert_eq!(format_bucket(""), None);
        assert_eq!(format_bucket("yesterday"), None);
        assert_eq!(format_bucket("2024-13-45T00:00:00Z"), None);
    }

    #[test]
    fn test_transfer_target_layout() {
        let record = FileRecord::new("f1", "My:Song.mp3");
        let target = TransferTarget::new(&record, "2024-01-02_030405", Path::new("/dl"), false);
        assert_eq!(target.directory, PathBuf::from("/dl/2024-01-02_030405_f1"));
        assert_eq!(
            target.file,
            PathBuf::from("/dl/2024-01-02_030405_f1/My_Song.mp3")
        );
        assert_eq!(
            target.partial_file(),
            PathBuf::from("/dl/2024-01-02_030405_f1/My_Song.mp3.part")
        );
        assert_eq!(target.display_name(), "2024-01-02_030405_f1/My_Song.mp3");
    }

    #[test]
    fn test_transfer_outcome_is_ok() {
        assert!(TransferOutcome::Success.is_ok());
        assert!(TransferOutcome::Skipped.is_ok());
        assert!(!TransferOutcome::Failed("x".into()).is_ok());
    }

    #[tokio::test]
    async fn test_find_existing_bucket_requires_file_and_valid_bucket() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        std::fs::create_dir(root.join("2023-05-06_070809_abc")).unwrap();
        std::fs::write(root.join("2023-05-06_070809_abc/memo.m4a"), b"x").unwrap();
        std::fs::create_dir(root.join("2023-01-01_000000_abc")).unwrap();
        std::fs::create_dir(root.join("not-a-bucket_abc")).unwrap();
        std::fs::write(root.join("not-a-bucket_abc/memo.m4a"), b"x").unwrap();

        assert_eq!(
            find_existing_bucket(root, "abc", "memo.m4a").await.as_deref(),
            Some("2023-05-06_070809")
        );
        assert_eq!(find_existing_bucket(root, "zzz", "memo.m4a").await, None);
    }

    #[tokio::test]
    async fn test_find_existing_bucket_missing_root() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert_eq!(find_existing_bucket(&missing, "abc", "a.mp3").await, None);
    }
}
