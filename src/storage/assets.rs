use bytes::Bytes;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

use super::keys::{generate_key, public_path, validate_key};
use super::metadata::MetadataStore;
use super::models::{AssetRecord, NewAsset};
use super::StorageError;
use crate::blob_store::{BlobStore, BlobStoreError, LocalBlobStore};

/// Counts from a startup recovery sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    pub staged_removed: u64,
    pub deletes_completed: u64,
    pub orphans_removed: u64,
}

/// Pairs every blob with its metadata record.
///
/// The record is the commit point in both directions: an upload is visible once its
/// record is renamed into place, and a delete takes effect once the record leaves.
pub struct AssetStore {
    blobs: Arc<dyn BlobStore>,
    metadata: MetadataStore,
}

impl AssetStore {
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: MetadataStore) -> Self {
        Self { blobs, metadata }
    }

    /// Standard layout: blobs in `<public_dir>/uploads`, records in `<public_dir>/metadata`.
    pub fn open<P: AsRef<Path>>(public_dir: P) -> Self {
        let root = public_dir.as_ref();
        Self::new(
            Arc::new(LocalBlobStore::new(root.join("uploads"))),
            MetadataStore::new(root.join("metadata")),
        )
    }

    pub async fn create(&self, upload: NewAsset) -> Result<AssetRecord, StorageError> {
        let id = generate_key(upload.original_filename.as_deref());
        let record = AssetRecord {
            path: public_path(&id),
            id,
            filename: upload.filename,
            description: upload.description,
            category: upload.category,
            original_filename: upload.original_filename.unwrap_or_default(),
            upload_date: Utc::now(),
        };

        if let Err(e) = self.write_pair(&record, upload.data).await {
            self.rollback_create(&record.id).await;
            return Err(e);
        }

        Ok(record)
    }

    async fn write_pair(&self, record: &AssetRecord, data: Bytes) -> Result<(), StorageError> {
        self.blobs.stage(&record.id, data).await?;
        self.metadata.stage(record).await?;
        self.blobs.commit(&record.id).await?;
        self.metadata.commit(&record.id).await?;
        Ok(())
    }

    async fn rollback_create(&self, id: &str) {
        if let Err(e) = self.blobs.discard(id).await {
            tracing::warn!(file_id = %id, error = %e, "Failed to discard blob after failed upload");
        }
        if let Err(e) = self.metadata.discard(id).await {
            tracing::warn!(file_id = %id, error = %e, "Failed to discard metadata after failed upload");
        }
    }

    /// All records, optionally narrowed to one category. Order is unspecified.
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<AssetRecord>, StorageError> {
        let records = self.metadata.list().await?;
        Ok(match category {
            Some(category) => records
                .into_iter()
                .filter(|r| r.category == category)
                .collect(),
            None => records,
        })
    }

    pub async fn get(&self, id: &str) -> Result<AssetRecord, StorageError> {
        validate_key(id)?;
        self.metadata.get(id).await
    }

    pub async fn blob(&self, id: &str) -> Result<Bytes, StorageError> {
        validate_key(id)?;
        match self.blobs.get(id).await {
            Err(BlobStoreError::NotFound(_)) => Err(StorageError::NotFound(format!("blob {id}"))),
            other => Ok(other?),
        }
    }

    /// Remove the record and its blob. Fails with `NotFound` if either is missing,
    /// though whichever half does exist is still removed.
    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        validate_key(id)?;

        if let Err(e) = self.metadata.move_to_trash(id).await {
            // Both halves are always attempted; a blob left without its record goes too.
            if matches!(e, StorageError::NotFound(_)) {
                match self.blobs.delete(id).await {
                    Ok(()) => tracing::warn!(file_id = %id, "Removed blob with no metadata record"),
                    Err(BlobStoreError::NotFound(_)) => {}
                    Err(blob_err) => {
                        tracing::warn!(file_id = %id, error = %blob_err, "Failed to remove blob with no metadata record");
                    }
                }
            }
            return Err(e);
        }

        match self.blobs.delete(id).await {
            Ok(()) => {
                self.finish_delete(id).await;
                Ok(())
            }
            Err(BlobStoreError::NotFound(_)) => {
                self.finish_delete(id).await;
                Err(StorageError::NotFound(format!("blob {id}")))
            }
            Err(e) => {
                if let Err(restore_err) = self.metadata.restore_from_trash(id).await {
                    tracing::error!(file_id = %id, error = %restore_err, "Failed to restore metadata after failed delete");
                }
                Err(e.into())
            }
        }
    }

    async fn finish_delete(&self, id: &str) {
        // A leftover trash entry is picked up by the next recovery sweep.
        if let Err(e) = self.metadata.purge_trash_entry(id).await {
            tracing::warn!(file_id = %id, error = %e, "Failed to purge trashed metadata");
        }
    }

    /// Settle anything an interrupted upload or delete left behind. Run before serving.
    pub async fn recover(&self) -> Result<RecoveryStats, StorageError> {
        let mut stats = RecoveryStats {
            staged_removed: self.blobs.clear_staging().await? + self.metadata.clear_staging().await?,
            ..Default::default()
        };

        for id in self.metadata.trashed_ids().await? {
            self.blobs.discard(&id).await?;
            self.metadata.purge_trash_entry(&id).await?;
            stats.deletes_completed += 1;
        }

        let known = self.metadata.ids().await?;
        for key in self.blobs.keys().await? {
            if !known.contains(&key) {
                tracing::warn!(file_id = %key, "Removing blob with no metadata record");
                self.blobs.discard(&key).await?;
                stats.orphans_removed += 1;
            }
        }

        Ok(stats)
    }
}
