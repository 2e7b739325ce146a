//! Batch configuration values.
//!
//! A [`BatchConfig`] is built once by the application (defaults, then config
//! file, then CLI overrides) and passed by reference into the batch driver.
//! Nothing in the library reads or mutates process-wide settings.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::fetch::ExtensionSet;

/// Literal folder id denoting the top-level container.
pub const ROOT_FOLDER: &str = "root";

/// Largest page size the Drive API accepts for file listings.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Default cap on pages fetched per folder.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Extensions fetched when nothing else is configured.
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 2] = [".mp3", ".m4a"];

/// How folder listings are paged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingOptions {
    /// Requested page size, clamped to `1..=MAX_PAGE_SIZE` when used.
    pub page_size: u32,
    /// Follow `nextPageToken` continuation. When false only the first page of
    /// each folder is read and any ignored continuation is logged as a warning.
    pub follow_next_page: bool,
    /// Upper bound on pages read per folder.
    pub max_pages: usize,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            follow_next_page: true,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl ListingOptions {
    /// Page size actually sent to the store.
    #[must_use]
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// What a batch reports as its total when files were listed but none matched
/// the extension filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyFilterReport {
    /// Report `0/0`; the run counts as complete.
    #[default]
    Zero,
    /// Report `0/<files listed>`; the run counts as incomplete.
    AllListed,
}

impl EmptyFilterReport {
    /// Returns the stable string label used in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::AllListed => "all_listed",
        }
    }
}

impl fmt::Display for EmptyFilterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmptyFilterReport {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(Self::Zero),
            "all_listed" | "all-listed" => Ok(Self::AllListed),
            other => Err(format!(
                "unknown empty filter report '{other}' (expected 'zero' or 'all_listed')"
            )),
        }
    }
}

/// Everything one batch run needs besides the store itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Folder ids to list, in order. `root` is the top-level container.
    pub folders: Vec<String>,
    /// Absolute directory under which date buckets are created.
    pub download_root: PathBuf,
    /// Extensions selected for transfer.
    pub allowed_extensions: ExtensionSet,
    /// Delete each file at the source after a verified transfer.
    pub delete_after: bool,
    /// Listing paging behavior.
    pub listing: ListingOptions,
    /// Total reported when nothing matched the filter.
    pub empty_filter_report: EmptyFilterReport,
}

impl BatchConfig {
    /// Creates a config with default folders (`root`), audio extensions, and no deletion.
    #[must_use]
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            folders: vec![ROOT_FOLDER.to_string()],
            download_root: download_root.into(),
            allowed_extensions: ExtensionSet::default(),
            delete_after: false,
            listing: ListingOptions::default(),
            empty_filter_report: EmptyFilterReport::default(),
        }
    }

    /// Replaces the folder list.
    #[must_use]
    pub fn with_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.folders = folders.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the allowed extensions.
    #[must_use]
    pub fn with_extensions(mut self, allowed_extensions: ExtensionSet) -> Self {
        self.allowed_extensions = allowed_extensions;
        self
    }

    /// Enables or disables deletion at the source.
    #[must_use]
    pub fn with_delete_after(mut self, delete_after: bool) -> Self {
        self.delete_after = delete_after;
        self
    }

    /// Replaces the listing options.
    #[must_use]
    pub fn with_listing(mut self, listing: ListingOptions) -> Self {
        self.listing = listing;
        self
    }

    /// Replaces the empty-filter reporting choice.
    #[must_use]
    pub fn with_empty_filter_report(mut self, report: EmptyFilterReport) -> Self {
        self.empty_filter_report = report;
        self
    }
}
