use crate::traits::{StorageError, StorageResult};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem collaborator used for non-vendor locations
#[derive(Clone, Debug, Default)]
pub struct LocalFilesystem {
    root: Option<PathBuf>,
}

impl LocalFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root` instead of the working directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        if path.is_empty() {
            return Err(StorageError::InvalidKey("empty path".to_string()));
        }
        let path = Path::new(path);
        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        })
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    pub async fn read(&self, path: &str) -> StorageResult<Bytes> {
        let path = self.resolve(path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.display().to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local read successful"
        );

        Ok(Bytes::from(data))
    }

    pub async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.resolve(path)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local write successful"
        );

        Ok(())
    }

    /// Delete a file. Returns `false` if it did not exist.
    pub async fn delete(&self, path: &str) -> StorageResult<bool> {
        let path = self.resolve(path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(false);
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local delete successful"
        );

        Ok(true)
    }

    /// File names directly inside `dir`, sorted.
    pub async fn list(&self, dir: &str) -> StorageResult<Vec<String>> {
        let dir = self.resolve(dir)?;
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to list {}: {}", dir.display(), e))
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        tracing::debug!(path = %dir.display(), count = names.len(), "Local list successful");

        Ok(names)
    }
}
