//! Exposed-entities data stored inside a CoE config entry

use coe_core::{ExposedEntitiesConfig, CONF_ENTITIES_TO_SEND};
use tracing::warn;

use crate::entry::ConfigEntry;
use crate::manager::{ConfigEntries, ConfigEntriesError, ConfigEntriesResult};

/// Read the slot assignments of an entry
///
/// Missing or malformed data yields an empty configuration.
pub fn read_exposed(entry: &ConfigEntry) -> ExposedEntitiesConfig {
    let Some(value) = entry.data.get(CONF_ENTITIES_TO_SEND) else {
        return ExposedEntitiesConfig::default();
    };

    match serde_json::from_value(value.clone()) {
        Ok(config) => config,
        Err(e) => {
            warn!(
                "Malformed {} in entry {}: {}",
                CONF_ENTITIES_TO_SEND, entry.entry_id, e
            );
            ExposedEntitiesConfig::default()
        }
    }
}

/// Store slot assignments in an entry, keeping its other data keys
pub async fn write_exposed(
    entries: &ConfigEntries,
    entry_id: &str,
    config: &ExposedEntitiesConfig,
) -> ConfigEntriesResult<ConfigEntry> {
    let entry = entries
        .get(entry_id)
        .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

    let value = serde_json::to_value(config)
        .map_err(|e| ConfigEntriesError::Storage(e.into()))?;

    let mut data = entry.data;
    data.insert(CONF_ENTITIES_TO_SEND.to_string(), value);
    entries.update_data(entry_id, data).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use coe_core::Slot;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_key() {
        let entry = ConfigEntry::new("ta_coe", "CoE");
        assert!(read_exposed(&entry).is_empty());
    }

    #[test]
    fn test_read_malformed_data() {
        let entry = ConfigEntry::new("ta_coe", "CoE").with_data(HashMap::from([(
            CONF_ENTITIES_TO_SEND.to_string(),
            json!({"1": "sensor.legacy"}),
        )]));
        // Unknown keys are ignored, both channels default
        assert!(read_exposed(&entry).is_empty());

        let entry = ConfigEntry::new("ta_coe", "CoE").with_data(HashMap::from([(
            CONF_ENTITIES_TO_SEND.to_string(),
            json!({"analog": "nope"}),
        )]));
        assert!(read_exposed(&entry).is_empty());
    }

    #[tokio::test]
    async fn test_write_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let entries = ConfigEntries::new(Arc::new(Storage::new(dir.path())));
        let entry = entries
            .add(ConfigEntry::new("ta_coe", "CoE").with_data(HashMap::from([(
                "host".to_string(),
                json!("192.168.1.20"),
            )])))
            .await
            .unwrap();

        let config = ExposedEntitiesConfig::new(
            vec![Slot::new(1, "sensor.boiler")],
            vec![Slot::new(3, "binary_sensor.pump")],
        );
        let updated = write_exposed(&entries, &entry.entry_id, &config).await.unwrap();

        assert_eq!(updated.data.get("host"), Some(&json!("192.168.1.20")));
        assert_eq!(read_exposed(&updated), config);
    }

    #[tokio::test]
    async fn test_write_unknown_entry() {
        let dir = TempDir::new().unwrap();
        let entries = ConfigEntries::new(Arc::new(Storage::new(dir.path())));
        let result = write_exposed(&entries, "missing", &ExposedEntitiesConfig::default()).await;
        assert!(matches!(result, Err(ConfigEntriesError::NotFound(_))));
    }
}
