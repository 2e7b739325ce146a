//! Extension-based record selection.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::config::DEFAULT_ALLOWED_EXTENSIONS;
use crate::drive::FileRecord;

/// Normalized set of allowed extensions (lower case, leading dot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    /// Builds a set, normalizing `MP3`, `.Mp3` and `mp3` to `.mp3`. Blank entries are dropped.
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        )
    }

    /// Returns true if `extension` (already including its dot) is allowed.
    #[must_use]
    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(&extension.to_lowercase())
    }

    /// Returns true if nothing is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the normalized extensions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS)
    }
}

impl std::fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(", ");
        write!(f, "[{joined}]")
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_lowercase()))
}

/// Returns the lower-cased suffix of `name` from its last `.` (inclusive),
/// or an empty string when there is no dot.
#[must_use]
pub fn extension_of(name: &str) -> String {
    name.rfind('.')
        .map(|pos| name[pos..].to_lowercase())
        .unwrap_or_default()
}

/// Keeps the records whose name extension is in `allowed`, preserving order.
///
/// Records with no name or a non-matching extension are dropped, never erred.
#[must_use]
pub fn filter_by_extension(records: Vec<FileRecord>, allowed: &ExtensionSet) -> Vec<FileRecord> {
    info!(extensions = %allowed, "filtering files by extension");

    let selected: Vec<FileRecord> = records
        .into_iter()
        .filter(|record| {
            let extension = extension_of(&record.name);
            let keep = !record.name.is_empty() && allowed.contains(&extension);
            if keep {
                debug!(name = %record.name, "matched file");
            } else {
                debug!(name = %record.name, extension = %extension, "skipping file");
            }
            keep
        })
        .collect();

    info!(count = selected.len(), "files selected for transfer");
    selected
}
