//! Batch driver: listing, filtering, and sequential transfers.

use tracing::{info, instrument, warn};

use super::{TransferOutcome, filter_by_extension, list_all, transfer};
use crate::config::{BatchConfig, EmptyFilterReport};
use crate::drive::FileStore;

/// Counts accumulated over one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Records that ended as `Success` or `Skipped`.
    pub success_count: usize,
    /// Records considered for transfer.
    pub total_count: usize,
}

impl BatchResult {
    /// Creates a result from raw counts.
    #[must_use]
    pub fn new(success_count: usize, total_count: usize) -> Self {
        Self {
            success_count,
            total_count,
        }
    }

    /// Returns true when every considered record succeeded (vacuously true for `{0, 0}`).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.success_count == self.total_count
    }

    /// Number of records that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.total_count.saturating_sub(self.success_count)
    }
}

impl std::fmt::Display for BatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.success_count, self.total_count)
    }
}

/// Runs one batch: list every configured folder, keep allowed extensions,
/// then transfer each selected record in listing order.
///
/// Per-record failures are counted and never stop the loop. Nothing in here
/// returns an error; the caller maps the counts to an exit status.
#[instrument(skip_all, fields(root = %config.download_root.display()))]
pub async fn run_batch(store: &dyn FileStore, config: &BatchConfig) -> BatchResult {
    let records = list_all(&config.folders, store, &config.listing).await;
    if records.is_empty() {
        warn!("no files found in the configured folders");
        return BatchResult::default();
    }

    let listed = records.len();
    let selected = filter_by_extension(records, &config.allowed_extensions);
    if selected.is_empty() {
        warn!(
            extensions = %config.allowed_extensions,
            listed,
            "no files with allowed extensions found"
        );
        return match config.empty_filter_report {
            EmptyFilterReport::Zero => BatchResult::default(),
            EmptyFilterReport::AllListed => BatchResult::new(0, listed),
        };
    }

    let total = selected.len();
    let mut success_count = 0usize;

    for (index, record) in selected.iter().enumerate() {
        info!(
            position = index + 1,
            total,
            name = %record.name,
            "processing file"
        );
        match transfer(record, store, &config.download_root, config.delete_after).await {
            TransferOutcome::Success | TransferOutcome::Skipped => success_count += 1,
            TransferOutcome::Failed(reason) => {
                warn!(name = %record.name, id = %record.id, reason = %reason, "file not transferred");
            }
        }
    }

    let result = BatchResult::new(success_count, total);
    if result.is_complete() {
        info!(result = %result, "batch complete");
    } else {
        warn!(
            result = %result,
            failed = result.failed_count(),
            "batch finished with failures"
        );
    }
    result
}
