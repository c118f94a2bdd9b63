/// Media storage backends
///
/// Handlers talk to storage through the [`MediaStorage`] trait so tests can
/// point the API at a temporary directory. [`LocalMediaStorage`] writes under
/// a root directory on the local filesystem.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Relative path escapes the storage root or is absolute
    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where uploaded media lives
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Writes `bytes` at `relative_path`, creating parent directories
    async fn save(&self, relative_path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Removes the file at `relative_path`
    ///
    /// Returns false if there was nothing to remove.
    async fn delete(&self, relative_path: &str) -> Result<bool, StorageError>;
}

/// Filesystem storage rooted at one directory
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path under the root
    ///
    /// Only plain path components are accepted.
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(relative_path);

        if relative_path.is_empty()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath(relative_path.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, relative_path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(relative_path)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Saved media file");
        Ok(())
    }

    async fn delete(&self, relative_path: &str) -> Result<bool, StorageError> {
        let path = self.resolve(relative_path)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed media file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_escaping_paths() {
        let storage = LocalMediaStorage::new("/srv/media");

        assert!(storage.resolve("uploads/recipe/a.jpg").is_ok());
        assert!(matches!(storage.resolve("../secret"), Err(StorageError::InvalidPath(_))));
        assert!(matches!(
            storage.resolve("uploads/../../secret"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(storage.resolve("/etc/passwd"), Err(StorageError::InvalidPath(_))));
        assert!(matches!(storage.resolve(""), Err(StorageError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path());
        let path = "uploads/recipe/test.jpg";

        storage.save(path, b"\xFF\xD8\xFFdata").await.unwrap();
        assert!(dir.path().join(path).is_file());

        assert!(storage.delete(path).await.unwrap());
        assert!(!dir.path().join(path).exists());
        assert!(!storage.delete(path).await.unwrap());
    }
}
