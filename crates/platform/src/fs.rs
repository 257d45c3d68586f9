//! Filesystem convenience helpers.
//!
//! These functions provide a stable API returning `relval_errors::Error`
//! with the failing operation and path folded into the message.

use relval_errors::PlatformError;
use std::path::Path;
use tokio::fs;

/// Result type for filesystem operations
pub type Result<T> = std::result::Result<T, relval_errors::Error>;

fn failed(operation: &str, path: &Path, err: &std::io::Error) -> relval_errors::Error {
    PlatformError::FilesystemOperationFailed {
        operation: operation.to_string(),
        message: format!("{}: {err}", path.display()),
    }
    .into()
}

/// Create a directory and all of its parents
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| failed("create_dir_all", path, &e))
}

/// Recursively remove a directory; a missing directory is not an error
///
/// # Errors
///
/// Returns an error if the directory exists and cannot be removed.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(failed("remove_dir_all", path, &e)),
    }
}

/// Write `contents` to `path`, creating parent directories first
///
/// # Errors
///
/// Returns an error if a parent cannot be created or the write fails.
pub async fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).await?;
        }
    }
    fs::write(path, contents)
        .await
        .map_err(|e| failed("write_file", path, &e))
}

/// Check if a path exists
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Check if a path exists and is a directory
pub async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Modules/AliRoot/v5-05-Rev-01");

        write_file(&path, "#%Module1.0\n").await.unwrap();
        assert!(exists(&path).await);
        assert!(!is_dir(&path).await);
        assert!(is_dir(path.parent().unwrap()).await);
    }

    #[tokio::test]
    async fn remove_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("Packages");

        remove_dir_all(&target).await.unwrap();
        create_dir_all(&target.join("bin")).await.unwrap();
        remove_dir_all(&target).await.unwrap();
        assert!(!exists(&target).await);
    }

    #[tokio::test]
    async fn failure_names_the_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "x").unwrap();

        let err = create_dir_all(&file.join("below")).await.unwrap_err();
        assert!(err.to_string().contains("plain"));
    }
}
