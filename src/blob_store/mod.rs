mod local;

pub use local::LocalBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blob not found: {0}")]
    NotFound(String),
}

/// Abstraction over blob storage backends.
///
/// Writes are two-phase: `stage` puts the bytes somewhere invisible to `get`/`keys`,
/// `commit` publishes them under the same key. Keys are validated by the caller.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn stage(&self, key: &str, data: Bytes) -> Result<(), BlobStoreError>;
    async fn commit(&self, key: &str) -> Result<(), BlobStoreError>;
    /// Remove a blob whether staged or published. Absence is not an error.
    async fn discard(&self, key: &str) -> Result<(), BlobStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, BlobStoreError>;
    /// Remove a published blob. Fails with `NotFound` when there is nothing to remove.
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError>;
    /// Keys of all published blobs, in no particular order.
    async fn keys(&self) -> Result<Vec<String>, BlobStoreError>;
    /// Drop everything left in the staging area. Returns the number of blobs removed.
    async fn clear_staging(&self) -> Result<u64, BlobStoreError>;
}
