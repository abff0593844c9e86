use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{BlobStore, BlobStoreError};

const STAGING_DIR: &str = ".staging";

/// Local filesystem blob store. Published blobs sit directly in `base_path`,
/// staged ones in `base_path/.staging` so a rename publishes them atomically.
pub struct LocalBlobStore {
    base_path: PathBuf,
    staging_path: PathBuf,
}

impl LocalBlobStore {
    /// Directories are created lazily on first write.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base_path = base_path.as_ref().to_path_buf();
        let staging_path = base_path.join(STAGING_DIR);
        Self {
            base_path,
            staging_path,
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn staged_path(&self, key: &str) -> PathBuf {
        self.staging_path.join(key)
    }
}

fn not_found_as(key: &str, e: std::io::Error) -> BlobStoreError {
    if e.kind() == ErrorKind::NotFound {
        BlobStoreError::NotFound(key.to_string())
    } else {
        BlobStoreError::Io(e)
    }
}

async fn remove_if_present(path: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn stage(&self, key: &str, data: Bytes) -> Result<(), BlobStoreError> {
        tokio::fs::create_dir_all(&self.staging_path).await?;
        tokio::fs::write(self.staged_path(key), &data).await?;
        Ok(())
    }

    async fn commit(&self, key: &str) -> Result<(), BlobStoreError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        tokio::fs::rename(self.staged_path(key), self.blob_path(key))
            .await
            .map_err(|e| not_found_as(key, e))
    }

    async fn discard(&self, key: &str) -> Result<(), BlobStoreError> {
        remove_if_present(&self.staged_path(key)).await?;
        remove_if_present(&self.blob_path(key)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, BlobStoreError> {
        let data = tokio::fs::read(self.blob_path(key))
            .await
            .map_err(|e| not_found_as(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        tokio::fs::remove_file(self.blob_path(key))
            .await
            .map_err(|e| not_found_as(key, e))
    }

    async fn keys(&self) -> Result<Vec<String>, BlobStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                keys.push(name.to_string());
            }
        }
        Ok(keys)
    }

    async fn clear_staging(&self) -> Result<u64, BlobStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.staging_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                remove_if_present(&entry.path()).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
