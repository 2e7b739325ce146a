//! Listing aggregation across configured folders.

use tracing::{debug, error, info, warn};

use crate::config::{ListingOptions, ROOT_FOLDER};
use crate::drive::{FileRecord, FileStore};

/// Lists every configured folder and concatenates the results.
///
/// Records keep folder order, then server response order within a folder.
/// A folder whose listing fails is logged and contributes nothing (or only
/// the pages read before the failure); it never aborts the whole listing.
/// Records reachable from two folders appear twice.
pub async fn list_all(
    folders: &[String],
    store: &dyn FileStore,
    options: &ListingOptions,
) -> Vec<FileRecord> {
    let mut all_files = Vec::new();

    for folder in folders {
        let label = folder_label(folder);
        info!(folder = %label, "listing files");
        let files = list_folder(folder, &label, store, options).await;
        info!(folder = %label, count = files.len(), "found files");
        all_files.extend(files);
    }

    info!(total = all_files.len(), "total files found across all folders");
    all_files
}

async fn list_folder(
    folder: &str,
    label: &str,
    store: &dyn FileStore,
    options: &ListingOptions,
) -> Vec<FileRecord> {
    let page_size = options.effective_page_size();
    let mut files = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = match store.list_page(folder, page_size, page_token.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                error!(folder = %label, error = %e, kept = files.len(), "error listing files");
                break;
            }
        };
        pages += 1;

        for file in &page.files {
            debug!(
                name = %file.name,
                id = %file.id,
                size = ?file.size_bytes,
                "listed file"
            );
        }
        files.extend(page.files);

        let Some(next) = page.next_page_token.filter(|token| !token.is_empty()) else {
            break;
        };
        if !options.follow_next_page {
            warn!(
                folder = %label,
                listed = files.len(),
                "more results available but pagination is disabled; listing truncated"
            );
            break;
        }
        if pages >= options.max_pages {
            warn!(
                folder = %label,
                pages,
                listed = files.len(),
                "page limit reached; listing truncated"
            );
            break;
        }
        page_token = Some(next);
    }

    files
}

fn folder_label(folder: &str) -> String {
    if folder == ROOT_FOLDER {
        "root directory".to_string()
    } else {
        format!("folder {folder}")
    }
}
