//! Path resolution and directory creation.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::FetchError;

/// Resolves `input` against `base`, producing an absolute path.
///
/// Absolute inputs ignore `base`. Existing paths are canonicalized (symlinks
/// resolved); paths that do not exist yet are normalized lexically, so
/// resolution never fails for directories that will be created later.
#[must_use]
pub fn resolve(input: impl AsRef<Path>, base: &Path) -> PathBuf {
    let input = input.as_ref();
    let joined = if input.is_absolute() {
        input.to_path_buf()
    } else {
        base.join(input)
    };
    let absolute = if joined.is_absolute() {
        joined
    } else {
        std::path::absolute(&joined).unwrap_or(joined)
    };

    std::fs::canonicalize(&absolute).unwrap_or_else(|_| normalize_lexically(&absolute))
}

/// Removes `.` components and folds `..` into its parent without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Creates `path` and all missing ancestors.
///
/// Succeeds silently when the directory already exists.
///
/// # Errors
///
/// Returns [`FetchError::Io`] when creation is blocked (permissions, a file in
/// the way, disk full).
pub async fn ensure_directory(path: &Path) -> Result<(), FetchError> {
    if tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        return Ok(());
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    debug!(dir = %path.display(), "created directory");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_relative_joins_base() {
        let temp = TempDir::new().unwrap();
        let base = std::fs::canonicalize(temp.path()).unwrap();
        assert_eq!(resolve("downloads", &base), base.join("downloads"));
    }

    #[test]
    fn test_resolve_absolute_ignores_base() {
        let temp = TempDir::new().unwrap();
        let target = std::fs::canonicalize(temp.path()).unwrap();
        assert_eq!(resolve(&target, Path::new("/somewhere/else")), target);
    }

    #[test]
    fn test_resolve_normalizes_missing_paths() {
        let temp = TempDir::new().unwrap();
        let base = std::fs::canonicalize(temp.path()).unwrap();
        let resolved = resolve("a/./b/../c", &base);
        assert_eq!(resolved, base.join("a").join("c"));
    }

    #[test]
    fn test_resolve_canonicalizes_existing_paths() {
        let temp = TempDir::new().unwrap();
        let base = std::fs::canonicalize(temp.path()).unwrap();
        std::fs::create_dir(base.join("real")).unwrap();
        assert_eq!(resolve("real/../real", &base), base.join("real"));
    }

    #[test]
    fn test_resolve_result_is_absolute() {
        assert!(resolve("x", Path::new("relative/base")).is_absolute());
    }

    #[tokio::test]
    async fn test_ensure_directory_creates_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b").join("c");
        ensure_directory(&nested).await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_directory_existing_is_ok() {
        let temp = TempDir::new().unwrap();
        ensure_directory(temp.path()).await.unwrap();
        ensure_directory(temp.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_directory_file_in_the_way_is_io_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let result = ensure_directory(&blocker.join("child")).await;
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
