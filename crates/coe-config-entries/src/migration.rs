//! Migration of legacy CoE entries
//!
//! Version 1.1 entries store `entities_to_send` as a flat map
//! `{"1": "sensor.a", "2": "--FREE_SLOT_MARKER_D--", ...}`. Version 1.2
//! splits it into numbered analog and digital slots.

use coe_core::{
    Channel, EntityId, ExposedEntitiesConfig, Slot, CONF_ENTITIES_TO_SEND,
    FREE_SLOT_MARKER_ANALOG, FREE_SLOT_MARKER_DIGITAL,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::manager::{ConfigEntries, ConfigEntriesError, ConfigEntriesResult, ConfigEntryUpdate};

/// Minor version written by the migration
pub const CURRENT_MINOR_VERSION: u32 = 2;

/// Bring an entry to the current format
///
/// Returns `false` when the entry comes from a newer major version.
pub async fn migrate_entry(entries: &ConfigEntries, entry_id: &str) -> ConfigEntriesResult<bool> {
    let entry = entries
        .get(entry_id)
        .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

    debug!(
        "Migrating {} from version {}.{}",
        entry_id, entry.version, entry.minor_version
    );

    if entry.version > 1 {
        return Ok(false);
    }
    if entry.minor_version > 1 {
        return Ok(true);
    }

    let converted = match entry.data.get(CONF_ENTITIES_TO_SEND) {
        Some(Value::Object(legacy)) => convert_legacy(legacy),
        _ => ExposedEntitiesConfig::default(),
    };

    let value = serde_json::to_value(&converted)
        .map_err(|e| ConfigEntriesError::Storage(e.into()))?;
    let mut data = entry.data;
    data.insert(CONF_ENTITIES_TO_SEND.to_string(), value);

    entries
        .update(
            entry_id,
            ConfigEntryUpdate {
                data: Some(data),
                minor_version: Some(CURRENT_MINOR_VERSION),
                ..Default::default()
            },
        )
        .await?;

    info!(
        "Migrated entry {} to version 1.{} ({} analog, {} digital)",
        entry_id,
        CURRENT_MINOR_VERSION,
        converted.analog.len(),
        converted.digital.len()
    );
    Ok(true)
}

/// Convert the flat legacy map into per-channel slots
pub fn convert_legacy(legacy: &Map<String, Value>) -> ExposedEntitiesConfig {
    let mut config = ExposedEntitiesConfig::default();
    let mut analog_id = 1;
    let mut digital_id = 1;

    for entity_id in legacy_values(legacy) {
        if entity_id == FREE_SLOT_MARKER_ANALOG {
            analog_id += 1;
            continue;
        }
        if entity_id == FREE_SLOT_MARKER_DIGITAL {
            digital_id += 1;
            continue;
        }

        let channel = entity_id.parse::<EntityId>().ok().and_then(|id| id.channel());
        let Some(channel) = channel else {
            debug!("Dropping legacy entity {}", entity_id);
            continue;
        };

        let next_id = match channel {
            Channel::Analog => &mut analog_id,
            Channel::Digital => &mut digital_id,
        };
        config.channel_mut(channel).push(Slot::new(*next_id, entity_id));
        *next_id += 1;
    }

    config
}

/// String values of the legacy map, numeric keys in numeric order first
fn legacy_values(legacy: &Map<String, Value>) -> Vec<&str> {
    let mut keyed: Vec<(Option<u64>, &String, &str)> = legacy
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key.parse().ok(), key, v)))
        .collect();

    keyed.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(b.1),
    });

    keyed.into_iter().map(|(_, _, value)| value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ConfigEntry;
    use crate::exposed::read_exposed;
    use crate::storage::Storage;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn legacy(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    async fn add_entry(entries: &ConfigEntries, entry: ConfigEntry) -> String {
        entries.add(entry).await.unwrap().entry_id
    }

    #[test]
    fn test_convert_routes_by_domain() {
        let config = convert_legacy(&legacy(json!({
            "1": "sensor.a",
            "2": "binary_sensor.b",
            "3": "input_number.c",
            "4": "input_boolean.d"
        })));

        assert_eq!(
            config.analog,
            vec![Slot::new(1, "sensor.a"), Slot::new(2, "input_number.c")]
        );
        assert_eq!(
            config.digital,
            vec![Slot::new(1, "binary_sensor.b"), Slot::new(2, "input_boolean.d")]
        );
    }

    #[test]
    fn test_convert_free_slot_markers() {
        let config = convert_legacy(&legacy(json!({
            "1": "sensor.a",
            "2": FREE_SLOT_MARKER_ANALOG,
            "3": "sensor.b",
            "4": FREE_SLOT_MARKER_DIGITAL,
            "5": "binary_sensor.c"
        })));

        assert_eq!(
            config.analog,
            vec![Slot::new(1, "sensor.a"), Slot::new(3, "sensor.b")]
        );
        assert_eq!(config.digital, vec![Slot::new(2, "binary_sensor.c")]);
    }

    #[test]
    fn test_convert_drops_unknown_domains() {
        let config = convert_legacy(&legacy(json!({
            "1": "light.kitchen",
            "2": "sensor.a",
            "3": 42
        })));

        assert_eq!(config.analog, vec![Slot::new(1, "sensor.a")]);
        assert!(config.digital.is_empty());
    }

    #[test]
    fn test_convert_drops_malformed_entity_ids() {
        let config = convert_legacy(&legacy(json!({
            "1": "sensor.Bad Name",
            "2": "sensor",
            "3": "binary_sensor.door"
        })));

        assert!(config.analog.is_empty());
        assert_eq!(config.digital, vec![Slot::new(1, "binary_sensor.door")]);
    }

    #[test]
    fn test_convert_numeric_key_order() {
        let config = convert_legacy(&legacy(json!({
            "10": "sensor.late",
            "2": "sensor.early"
        })));

        assert_eq!(
            config.analog,
            vec![Slot::new(1, "sensor.early"), Slot::new(2, "sensor.late")]
        );
    }

    #[tokio::test]
    async fn test_migrate_legacy_entry() {
        let dir = TempDir::new().unwrap();
        let entries = ConfigEntries::new(Arc::new(Storage::new(dir.path())));
        let entry_id = add_entry(
            &entries,
            ConfigEntry::new("ta_coe", "CoE").with_data(HashMap::from([
                ("host".to_string(), json!("10.0.0.5")),
                (
                    CONF_ENTITIES_TO_SEND.to_string(),
                    json!({"1": "sensor.a", "2": "binary_sensor.b"}),
                ),
            ])),
        )
        .await;

        assert!(migrate_entry(&entries, &entry_id).await.unwrap());

        let entry = entries.get(&entry_id).unwrap();
        assert_eq!(entry.minor_version, 2);
        assert_eq!(entry.data.get("host"), Some(&json!("10.0.0.5")));
        let config = read_exposed(&entry);
        assert_eq!(config.analog, vec![Slot::new(1, "sensor.a")]);
        assert_eq!(config.digital, vec![Slot::new(1, "binary_sensor.b")]);
    }

    #[tokio::test]
    async fn test_migrate_without_legacy_data() {
        let dir = TempDir::new().unwrap();
        let entries = ConfigEntries::new(Arc::new(Storage::new(dir.path())));
        let entry_id = add_entry(&entries, ConfigEntry::new("ta_coe", "CoE")).await;

        assert!(migrate_entry(&entries, &entry_id).await.unwrap());

        let entry = entries.get(&entry_id).unwrap();
        assert_eq!(entry.minor_version, 2);
        assert!(read_exposed(&entry).is_empty());
    }

    #[tokio::test]
    async fn test_migrate_current_entry_is_untouched() {
        let dir = TempDir::new().unwrap();
        let entries = ConfigEntries::new(Arc::new(Storage::new(dir.path())));
        let data = HashMap::from([(
            CONF_ENTITIES_TO_SEND.to_string(),
            json!({"analog": [{"id": 4, "entity_id": "sensor.a"}]}),
        )]);
        let entry_id = add_entry(
            &entries,
            ConfigEntry::new("ta_coe", "CoE")
                .with_version(1, 2)
                .with_data(data.clone()),
        )
        .await;

        assert!(migrate_entry(&entries, &entry_id).await.unwrap());
        assert_eq!(entries.get(&entry_id).unwrap().data, data);
    }

    #[tokio::test]
    async fn test_migrate_refuses_downgrade() {
        let dir = TempDir::new().unwrap();
        let entries = ConfigEntries::new(Arc::new(Storage::new(dir.path())));
        let entry_id = add_entry(&entries, ConfigEntry::new("ta_coe", "CoE").with_version(2, 1)).await;

        assert!(!migrate_entry(&entries, &entry_id).await.unwrap());
        assert_eq!(entries.get(&entry_id).unwrap().version, 2);
    }
}
