use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::models::AssetRecord;
use super::StorageError;

const STAGING_DIR: &str = ".staging";
const TRASH_DIR: &str = ".trash";
const RECORD_EXT: &str = ".json";

/// Directory of JSON sidecar records, one `<id>.json` per asset.
///
/// Like the blob store, records are staged in `.staging/` and renamed into place.
/// Deletes rename the record into `.trash/` first so a crash mid-delete is recoverable.
pub struct MetadataStore {
    dir: PathBuf,
    staging: PathBuf,
    trash: PathBuf,
}

impl MetadataStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            staging: dir.join(STAGING_DIR),
            trash: dir.join(TRASH_DIR),
            dir,
        }
    }

    fn record_name(id: &str) -> String {
        format!("{id}{RECORD_EXT}")
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(Self::record_name(id))
    }

    fn staged_path(&self, id: &str) -> PathBuf {
        self.staging.join(Self::record_name(id))
    }

    fn trash_path(&self, id: &str) -> PathBuf {
        self.trash.join(Self::record_name(id))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub async fn stage(&self, record: &AssetRecord) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.staging).await?;
        let data = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(self.staged_path(&record.id), data).await?;
        Ok(())
    }

    pub async fn commit(&self, id: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::rename(self.staged_path(id), self.record_path(id)).await?;
        Ok(())
    }

    /// Remove a record whether staged or published. Absence is not an error.
    pub async fn discard(&self, id: &str) -> Result<(), StorageError> {
        remove_if_present(&self.staged_path(id)).await?;
        remove_if_present(&self.record_path(id)).await?;
        Ok(())
    }

    /// Hide a record from listings ahead of deleting its blob.
    pub async fn move_to_trash(&self, id: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.trash).await?;
        match tokio::fs::rename(self.record_path(id), self.trash_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("metadata for {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn restore_from_trash(&self, id: &str) -> Result<(), StorageError> {
        tokio::fs::rename(self.trash_path(id), self.record_path(id)).await?;
        Ok(())
    }

    pub async fn purge_trash_entry(&self, id: &str) -> Result<(), StorageError> {
        remove_if_present(&self.trash_path(id)).await?;
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Every readable record. Unreadable or malformed files are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<AssetRecord>, StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut records = Vec::new();
        for path in record_files(&self.dir).await? {
            match read_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable metadata file");
                }
            }
        }
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<AssetRecord, StorageError> {
        match read_record(&self.record_path(id)).await {
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("metadata for {id}")))
            }
            other => other,
        }
    }

    /// Ids of all published records, taken from their file names.
    pub async fn ids(&self) -> Result<HashSet<String>, StorageError> {
        ids_in(&self.dir).await
    }

    /// Ids whose delete was interrupted after the record moved to the trash.
    pub async fn trashed_ids(&self) -> Result<HashSet<String>, StorageError> {
        ids_in(&self.trash).await
    }

    /// Drop everything left in the staging area. Returns the number of records removed.
    pub async fn clear_staging(&self) -> Result<u64, StorageError> {
        let mut removed = 0;
        for path in all_files(&self.staging).await? {
            remove_if_present(&path).await?;
            removed += 1;
        }
        Ok(removed)
    }
}

async fn read_record(path: &Path) -> Result<AssetRecord, StorageError> {
    let content = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}

async fn remove_if_present(path: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Regular files directly inside `dir`. A missing directory yields nothing.
async fn all_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

async fn record_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    Ok(all_files(dir)
        .await?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(RECORD_EXT))
        })
        .collect())
}

async fn ids_in(dir: &Path) -> Result<HashSet<String>, StorageError> {
    Ok(record_files(dir)
        .await?
        .iter()
        .filter_map(|p| p.file_name()?.to_str()?.strip_suffix(RECORD_EXT))
        .map(str::to_string)
        .collect())
}
