//! Versioned JSON files under `.storage/`
//!
//! Files live in the `.storage/` directory of the config dir and carry
//! their own version.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed storage JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported version for {key}: expected {expected}, found {found}")]
    VersionMismatch {
        key: String,
        expected: u32,
        found: u32,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One stored document and its layout version
///
/// ```json
/// {
///   "version": 1,
///   "minor_version": 1,
///   "key": "core.config_entries",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    pub version: u32,
    pub minor_version: u32,
    pub key: String,
    pub data: T,
}

impl<T> StorageFile<T> {
    pub fn new(key: impl Into<String>, data: T, version: u32, minor_version: u32) -> Self {
        Self {
            version,
            minor_version,
            key: key.into(),
            data,
        }
    }
}

/// Handle on a `.storage/` directory
#[derive(Debug, Clone)]
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    /// Storage rooted at `<config_dir>/.storage`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: config_dir.as_ref().join(".storage"),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn file_path(&self, key: &str) -> PathBuf {
        self.storage_dir.join(key)
    }

    /// Read `key`, or `None` when nothing was written yet
    pub async fn load<T>(&self, key: &str) -> StorageResult<Option<StorageFile<T>>>
    where
        T: DeserializeOwned,
    {
        let path = self.file_path(key);

        if !fs::try_exists(&path).await? {
            debug!("No stored {} yet", key);
            return Ok(None);
        }

        let raw = fs::read(&path).await?;
        let file: StorageFile<T> = serde_json::from_slice(&raw)?;

        debug!("Read {} v{}.{}", key, file.version, file.minor_version);
        Ok(Some(file))
    }

    /// Write a storage file via a temp file and rename
    pub async fn save<T>(&self, storage_file: &StorageFile<T>) -> StorageResult<()>
    where
        T: Serialize,
    {
        fs::create_dir_all(&self.storage_dir).await?;

        let target = self.file_path(&storage_file.key);
        let staging = self.file_path(&format!("{}.tmp", storage_file.key));

        fs::write(&staging, serde_json::to_vec_pretty(storage_file)?).await?;
        fs::rename(&staging, &target).await?;

        debug!(
            "Wrote {} v{}.{}",
            storage_file.key, storage_file.version, storage_file.minor_version
        );
        Ok(())
    }
}
