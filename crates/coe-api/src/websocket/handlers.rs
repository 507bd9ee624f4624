//! WebSocket command handlers

use std::collections::HashSet;
use std::sync::Arc;

use coe_config_entries::{read_exposed, write_exposed, ConfigEntriesError};
use coe_core::{is_valid_entity_id, Channel, ExposedEntitiesConfig, DOMAIN, MAX_SLOTS};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::ActiveConnection;
use super::types::{error_codes, OutgoingMessage, ResultMessage};

/// Handle get_states command
pub async fn handle_get_states(
    conn: &Arc<ActiveConnection>,
    id: u64,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> Result<(), String> {
    let states = conn.state.states.all();
    let state_list: Vec<serde_json::Value> = states
        .iter()
        .map(|s| {
            json!({
                "entity_id": s.entity_id.to_string(),
                "state": s.state,
                "attributes": s.attributes,
                "last_changed": s.last_changed.to_rfc3339(),
                "last_updated": s.last_updated.to_rfc3339(),
            })
        })
        .collect();

    tx.send(ResultMessage::success(id, serde_json::Value::Array(state_list)))
        .await
        .map_err(|e| e.to_string())
}

/// Handle ta_coe/config/list command
pub async fn handle_config_list(
    conn: &Arc<ActiveConnection>,
    id: u64,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> Result<(), String> {
    let entries: Vec<_> = conn
        .state
        .config_entries
        .entries_for_domain(DOMAIN)
        .iter()
        .map(|entry| entry.metadata())
        .collect();

    debug!("Listing {} {} config entries", entries.len(), DOMAIN);
    tx.send(ResultMessage::success(id, json!({ "entries": entries })))
        .await
        .map_err(|e| e.to_string())
}

/// Handle ta_coe/expose/info command
pub async fn handle_expose_info(
    conn: &Arc<ActiveConnection>,
    id: u64,
    entry_id: &str,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> Result<(), String> {
    let result = match conn.state.config_entries.get(entry_id) {
        Some(entry) => ResultMessage::success(id, json!({ "config": read_exposed(&entry) })),
        None => not_found(id, entry_id),
    };
    tx.send(result).await.map_err(|e| e.to_string())
}

/// Handle ta_coe/expose/update command
pub async fn handle_expose_update(
    conn: &Arc<ActiveConnection>,
    id: u64,
    entry_id: &str,
    config: ExposedEntitiesConfig,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> Result<(), String> {
    if let Err(reason) = validate_exposed(&config) {
        warn!("Rejecting exposed config for {}: {}", entry_id, reason);
        let result = ResultMessage::error(id, error_codes::INVALID_FORMAT, reason);
        return tx.send(result).await.map_err(|e| e.to_string());
    }

    let result = match write_exposed(&conn.state.config_entries, entry_id, &config).await {
        Ok(_) => {
            info!(
                "Updated exposed entities of {} ({} analog, {} digital)",
                entry_id,
                config.analog.len(),
                config.digital.len()
            );
            ResultMessage::success(id, json!({}))
        }
        Err(ConfigEntriesError::NotFound(_)) => not_found(id, entry_id),
        Err(e) => ResultMessage::error(id, error_codes::UNKNOWN_ERROR, e.to_string()),
    };
    tx.send(result).await.map_err(|e| e.to_string())
}

fn not_found(id: u64, entry_id: &str) -> OutgoingMessage {
    ResultMessage::error(
        id,
        error_codes::NOT_FOUND,
        format!("Config entry not found: {}", entry_id),
    )
}

/// Check slot ids, entity ids and channel sizes of an incoming config
///
/// Ids must be unique within a channel.
pub fn validate_exposed(config: &ExposedEntitiesConfig) -> Result<(), String> {
    for channel in Channel::ALL {
        let slots = config.channel(channel);
        if slots.len() > MAX_SLOTS {
            return Err(format!(
                "{}: {} slots exceed the maximum of {}",
                channel,
                slots.len(),
                MAX_SLOTS
            ));
        }
        let mut seen = HashSet::with_capacity(slots.len());
        for slot in slots {
            if slot.id < 1 {
                return Err(format!("{} slot {}: id must be at least 1", channel, slot.id));
            }
            if !is_valid_entity_id(&slot.entity_id) {
                return Err(format!(
                    "{} slot {}: invalid entity_id '{}'",
                    channel, slot.id, slot.entity_id
                ));
            }
            if !seen.insert(slot.id) {
                return Err(format!("{} slot {}: duplicate id", channel, slot.id));
            }
        }
    }
    Ok(())
}
