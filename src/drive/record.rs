//! File metadata records as returned by the remote store.

use serde::{Deserialize, Deserializer};

/// Snapshot of a remote file's metadata taken at listing time.
///
/// Drive serializes `size` as a decimal string; numeric values are accepted
/// too. Unparsable sizes are treated as unknown.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Opaque identifier, unique within the store.
    pub id: String,
    /// Display name; may be empty, duplicated, or unsafe for a local filesystem.
    #[serde(default)]
    pub name: String,
    /// MIME type reported by the store.
    #[serde(default)]
    pub mime_type: String,
    /// Size in bytes, if the store knows it.
    #[serde(default, rename = "size", deserialize_with = "deserialize_size")]
    pub size_bytes: Option<u64>,
    /// Creation timestamp (ISO-8601) as sent by the store.
    #[serde(default)]
    pub created_time: Option<String>,
    /// Last modification timestamp (ISO-8601) as sent by the store.
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl FileRecord {
    /// Creates a record with only an id and a name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: String::new(),
            size_bytes: None,
            created_time: None,
            modified_time: None,
        }
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn with_created_time(mut self, created_time: impl Into<String>) -> Self {
        self.created_time = Some(created_time.into());
        self
    }

    /// Sets the size in bytes.
    #[must_use]
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    /// Records in server response order.
    #[serde(default)]
    pub files: Vec<FileRecord>,
    /// Continuation token when more results are available.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl FilePage {
    /// Creates a final page (no continuation token).
    #[must_use]
    pub fn last(files: Vec<FileRecord>) -> Self {
        Self {
            files,
            next_page_token: None,
        }
    }

    /// Creates a page followed by more results.
    #[must_use]
    pub fn with_next(files: Vec<FileRecord>, next_page_token: impl Into<String>) -> Self {
        Self {
            files,
            next_page_token: Some(next_page_token.into()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Text(String),
    Number(u64),
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let size = Option::<SizeRepr>::deserialize(deserializer)?;
    Ok(match size {
        Some(SizeRepr::Text(text)) => text.trim().parse().ok(),
        Some(SizeRepr::Number(n)) => Some(n),
        None => None,
    })
}
