mod assets;
mod keys;
mod metadata;
pub mod models;

pub use assets::{AssetStore, RecoveryStats};
pub use keys::{generate_key, public_path, validate_key};
pub use metadata::MetadataStore;

use thiserror::Error;

use crate::blob_store::BlobStoreError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob store error: {0}")]
    Blob(#[from] BlobStoreError),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
