//! Download orchestration and local file organization.
//!
//! This module turns a remote listing into a deterministic, idempotent local
//! layout:
//!
//! ```text
//! <download_root>/
//!   <YYYY-MM-DD_HHMMSS>_<file id>/
//!     <sanitized original filename>
//! ```
//!
//! # Features
//!
//! - Per-folder listing with failure containment and continuation paging
//! - Case-insensitive extension filtering
//! - Date-bucketed destination directories keyed by file id (no collisions)
//! - Write-to-temp-then-rename transfers, so only verified files get their final name
//! - Best-effort deletion at the source after verification
//!
//! # Example
//!
//! ```no_run
//! use drivefetch_core::{BatchConfig, DriveClient, run_batch};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = DriveClient::new("ya29.access-token")?;
//! let config = BatchConfig::new("/home/me/audio");
//! let result = run_batch(&store, &config).await;
//! println!("{}/{} files fetched", result.success_count, result.total_count);
//! # Ok(())
//! # }
//! ```

mod batch;
mod error;
mod filter;
mod listing;
pub mod paths;
mod sanitize;
mod transfer;

pub use batch::{BatchResult, run_batch};
pub use error::FetchError;
pub use filter::{ExtensionSet, extension_of, filter_by_extension};
pub use listing::list_all;
pub use sanitize::{FALLBACK_FILENAME, MAX_FILENAME_CHARS, sanitize};
pub use transfer::{
    BUCKET_FORMAT, PARTIAL_SUFFIX, TransferOutcome, TransferTarget, format_bucket, transfer,
};
