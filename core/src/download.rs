//! Destination handling for `download_to`.
//!
//! The destination is never overwritten: a pre-flight check fails before the
//! request is sent, and the file itself is opened with create-new semantics
//! so a file appearing in between still fails.

use std::io;
use std::path::Path;

use crate::error::HttpError;

pub(crate) fn ensure_absent(path: &Path) -> Result<(), HttpError> {
    if path.exists() {
        return Err(HttpError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

pub(crate) fn create_error(path: &Path, err: io::Error) -> HttpError {
    if err.kind() == io::ErrorKind::AlreadyExists {
        HttpError::AlreadyExists {
            path: path.to_path_buf(),
        }
    } else {
        HttpError::Io(err)
    }
}

/// Remove a partially written destination after a failed transfer.
pub(crate) fn discard_partial(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        warn_cleanup(path, &err);
    }
}

pub(crate) async fn discard_partial_async(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        warn_cleanup(path, &err);
    }
}

fn warn_cleanup(path: &Path, err: &io::Error) {
    tracing::warn!(path = %path.display(), error = %err, "failed to remove partial download");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_file_is_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = ensure_absent(file.path()).unwrap_err();
        assert!(matches!(err, HttpError::AlreadyExists { .. }));
    }

    #[test]
    fn missing_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        ensure_absent(&dir.path().join("new.bin")).unwrap();
    }

    #[test]
    fn partial_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        std::fs::write(&path, b"half").unwrap();
        discard_partial(&path);
        assert!(!path.exists());
        // Already gone: only logged.
        discard_partial(&path);
    }

    #[tokio::test]
    async fn partial_file_is_discarded_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        tokio::fs::write(&path, b"half").await.unwrap();
        discard_partial_async(&path).await;
        assert!(!path.exists());
    }

    #[test]
    fn already_exists_io_error_is_mapped() {
        let err = create_error(Path::new("x"), io::Error::from(io::ErrorKind::AlreadyExists));
        assert!(matches!(err, HttpError::AlreadyExists { .. }));
        let err = create_error(Path::new("x"), io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, HttpError::Io(_)));
    }
}
