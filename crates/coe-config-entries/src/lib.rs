//! Config entries for the CoE panel host
//!
//! Entries are persisted in `.storage/core.config_entries`. The CoE entries
//! carry their slot assignments under `data.entities_to_send`.

pub mod entry;
pub mod exposed;
pub mod manager;
pub mod migration;
pub mod storage;

pub use entry::{ConfigEntry, ConfigEntryDisabledBy, ConfigEntrySource};
pub use exposed::{read_exposed, write_exposed};
pub use manager::{
    ConfigEntries, ConfigEntriesData, ConfigEntriesError, ConfigEntriesResult, ConfigEntryUpdate,
    STORAGE_KEY,
};
pub use migration::migrate_entry;
pub use storage::{Storage, StorageError, StorageFile, StorageResult};
