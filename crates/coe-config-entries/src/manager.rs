//! Config Entries Manager
//!
//! Holds every config entry in memory and writes the full set to
//! `.storage/core.config_entries` after each mutation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::entry::ConfigEntry;
use crate::storage::{Storage, StorageError, StorageFile, StorageResult};

/// File name under `.storage/`
pub const STORAGE_KEY: &str = "core.config_entries";
/// Major layout version this build writes
pub const STORAGE_VERSION: u32 = 1;
pub const STORAGE_MINOR_VERSION: u32 = 1;

/// Config entries errors
#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("No config entry with id {0}")]
    NotFound(String),

    #[error("Config entry id {0} is already taken")]
    AlreadyExists(String),

    #[error("Config entry storage failed: {0}")]
    Storage(#[from] StorageError),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;

/// Body of the stored file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntriesData {
    pub entries: Vec<ConfigEntry>,
}

/// Partial update applied by [`ConfigEntries::update`]
#[derive(Debug, Clone, Default)]
pub struct ConfigEntryUpdate {
    pub title: Option<String>,
    pub data: Option<HashMap<String, serde_json::Value>>,
    pub options: Option<HashMap<String, serde_json::Value>>,
    pub version: Option<u32>,
    pub minor_version: Option<u32>,
}

/// In-memory registry of config entries, persisted on every change
pub struct ConfigEntries {
    storage: Arc<Storage>,

    /// entry_id to entry
    entries: DashMap<String, ConfigEntry>,

    /// domain to the ids of its entries
    by_domain: DashMap<String, HashSet<String>>,

    /// One writer at a time
    save_lock: Mutex<()>,
}

impl ConfigEntries {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            entries: DashMap::new(),
            by_domain: DashMap::new(),
            save_lock: Mutex::new(()),
        }
    }

    /// Read the stored entries into memory
    pub async fn load(&self) -> StorageResult<()> {
        let Some(storage_file) = self.storage.load::<ConfigEntriesData>(STORAGE_KEY).await? else {
            debug!("No stored config entries");
            return Ok(());
        };

        if storage_file.version > STORAGE_VERSION {
            return Err(StorageError::VersionMismatch {
                key: STORAGE_KEY.to_string(),
                expected: STORAGE_VERSION,
                found: storage_file.version,
            });
        }

        info!(
            "Read {} stored config entries, layout v{}.{}",
            storage_file.data.entries.len(),
            storage_file.version,
            storage_file.minor_version
        );

        for entry in storage_file.data.entries {
            self.insert_indexed(&entry);
        }
        Ok(())
    }

    /// Write every entry to disk
    pub async fn save(&self) -> StorageResult<()> {
        let _guard = self.save_lock.lock().await;

        let mut entries: Vec<ConfigEntry> = self.entries.iter().map(|r| r.value().clone()).collect();
        sort_entries(&mut entries);

        let storage_file = StorageFile::new(
            STORAGE_KEY,
            ConfigEntriesData { entries },
            STORAGE_VERSION,
            STORAGE_MINOR_VERSION,
        );

        self.storage.save(&storage_file).await?;
        debug!("Wrote {} config entries", self.entries.len());
        Ok(())
    }

    fn insert_indexed(&self, entry: &ConfigEntry) {
        self.entries.insert(entry.entry_id.clone(), entry.clone());
        self.by_domain
            .entry(entry.domain.clone())
            .or_default()
            .insert(entry.entry_id.clone());
    }

    fn remove_indexed(&self, entry: &ConfigEntry) {
        if let Some(mut ids) = self.by_domain.get_mut(&entry.domain) {
            ids.remove(&entry.entry_id);
        }
        self.entries.remove(&entry.entry_id);
    }

    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|r| r.value().clone())
    }

    /// All entries for a domain, in creation order
    pub fn get_by_domain(&self, domain: &str) -> Vec<ConfigEntry> {
        let mut entries: Vec<ConfigEntry> = self
            .by_domain
            .get(domain)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default();
        sort_entries(&mut entries);
        entries
    }

    /// Entries for a domain that are neither disabled nor ignored
    pub fn entries_for_domain(&self, domain: &str) -> Vec<ConfigEntry> {
        self.get_by_domain(domain)
            .into_iter()
            .filter(|e| !e.is_disabled() && !e.is_ignored())
            .collect()
    }

    /// Register an entry under its own id
    pub async fn add(&self, entry: ConfigEntry) -> ConfigEntriesResult<ConfigEntry> {
        if self.entries.contains_key(&entry.entry_id) {
            return Err(ConfigEntriesError::AlreadyExists(entry.entry_id));
        }

        self.insert_indexed(&entry);
        self.save().await?;

        info!(
            "Registered {} entry '{}' ({})",
            entry.domain, entry.title, entry.entry_id
        );

        Ok(entry)
    }

    /// Apply the set fields of `update` to one entry
    pub async fn update(
        &self,
        entry_id: &str,
        update: ConfigEntryUpdate,
    ) -> ConfigEntriesResult<ConfigEntry> {
        let Some(mut updated) = self.get(entry_id) else {
            return Err(ConfigEntriesError::NotFound(entry_id.to_string()));
        };

        if let Some(title) = update.title {
            updated.title = title;
        }
        if let Some(data) = update.data {
            updated.data = data;
        }
        if let Some(options) = update.options {
            updated.options = options;
        }
        if let Some(version) = update.version {
            updated.version = version;
        }
        if let Some(minor_version) = update.minor_version {
            updated.minor_version = minor_version;
        }
        updated.modified_at = Utc::now();

        self.insert_indexed(&updated);
        self.save().await?;

        debug!("Config entry {} changed", entry_id);
        Ok(updated)
    }

    /// Replace the data of an entry
    pub async fn update_data(
        &self,
        entry_id: &str,
        data: HashMap<String, serde_json::Value>,
    ) -> ConfigEntriesResult<ConfigEntry> {
        self.update(
            entry_id,
            ConfigEntryUpdate {
                data: Some(data),
                ..Default::default()
            },
        )
        .await
    }

    /// Forget an entry and persist
    pub async fn remove(&self, entry_id: &str) -> ConfigEntriesResult<ConfigEntry> {
        let Some(entry) = self.get(entry_id) else {
            return Err(ConfigEntriesError::NotFound(entry_id.to_string()));
        };

        self.remove_indexed(&entry);
        self.save().await?;

        info!(
            "Dropped {} entry '{}' ({})",
            entry.domain, entry.title, entry_id
        );

        Ok(entry)
    }

    pub fn entry_ids(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn sort_entries(entries: &mut [ConfigEntry]) {
    entries.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
}
