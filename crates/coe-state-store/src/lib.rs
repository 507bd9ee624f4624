//! Entity state storage with domain indexing
//!
//! The StateStore holds the current state of every entity the host knows.
//! The panel lists entities per channel, so lookups by domain are indexed.

use coe_core::{EntityId, State};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// The state store tracks all entity states
pub struct StateStore {
    /// All entity states keyed by entity_id string
    states: DashMap<String, State>,
    /// Index of entity_ids by domain
    domain_index: DashMap<String, Vec<String>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            domain_index: DashMap::new(),
        }
    }

    /// Set the state of an entity
    ///
    /// `last_changed` only moves when the state value actually changed.
    #[instrument(skip(self, state, attributes), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> State {
        let entity_id_str = entity_id.to_string();
        let domain = entity_id.domain().to_string();

        let old_state = self.states.get(&entity_id_str).map(|s| s.clone());

        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, attributes),
            None => State::new(entity_id, state, attributes),
        };

        debug!(
            state = %new_state.state,
            changed = old_state.as_ref().map(|s| s.state != new_state.state).unwrap_or(true),
            "Setting entity state"
        );

        self.states.insert(entity_id_str.clone(), new_state.clone());

        if old_state.is_none() {
            self.domain_index
                .entry(domain)
                .or_default()
                .push(entity_id_str);
        }

        new_state
    }

    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// All entity IDs of a domain, in insertion order
    pub fn entity_ids(&self, domain: &str) -> Vec<String> {
        self.domain_index
            .get(domain)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Sorted entity IDs across several domains
    pub fn entity_ids_for_domains(&self, domains: &[&str]) -> Vec<String> {
        let mut ids: Vec<String> = domains
            .iter()
            .flat_map(|domain| self.entity_ids(domain))
            .collect();
        ids.sort();
        ids
    }

    pub fn all(&self) -> Vec<State> {
        self.states.iter().map(|r| r.value().clone()).collect()
    }

    /// Remove an entity's state
    #[instrument(skip(self), fields(entity_id = %entity_id))]
    pub fn remove(&self, entity_id: &EntityId) -> Option<State> {
        let entity_id_str = entity_id.to_string();
        let old_state = self.states.remove(&entity_id_str).map(|(_, s)| s);

        if old_state.is_some() {
            trace!("Removing entity state");
            if let Some(mut ids) = self.domain_index.get_mut(entity_id.domain()) {
                ids.retain(|id| id != &entity_id_str);
            }
        }

        old_state
    }

    pub fn entity_count(&self) -> usize {
        self.states.len()
    }
}

/// Thread-safe wrapper for StateStore
pub type SharedStateStore = Arc<StateStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use coe_core::domains::ANALOG_DOMAINS;
    use serde_json::json;

    fn id(s: &str) -> EntityId {
        s.parse().unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let store = StateStore::new();
        store.set(
            id("sensor.boiler"),
            "61.5",
            HashMap::from([("unit_of_measurement".to_string(), json!("°C"))]),
        );

        let state = store.get("sensor.boiler").unwrap();
        assert_eq!(state.state, "61.5");
        assert_eq!(state.preview(), "61.5 °C");
        assert_eq!(store.entity_count(), 1);
    }

    #[test]
    fn test_update_keeps_last_changed_for_same_value() {
        let store = StateStore::new();
        let first = store.set(id("sensor.a"), "1", HashMap::new());
        let second = store.set(id("sensor.a"), "1", HashMap::new());

        assert_eq!(first.last_changed, second.last_changed);
        assert_eq!(store.entity_ids("sensor"), vec!["sensor.a"]);
    }

    #[test]
    fn test_entity_ids_for_domains_sorted() {
        let store = StateStore::new();
        store.set(id("sensor.zeta"), "1", HashMap::new());
        store.set(id("input_number.alpha"), "2", HashMap::new());
        store.set(id("sensor.beta"), "3", HashMap::new());
        store.set(id("binary_sensor.door"), "on", HashMap::new());

        assert_eq!(
            store.entity_ids_for_domains(ANALOG_DOMAINS),
            vec!["input_number.alpha", "sensor.beta", "sensor.zeta"]
        );
    }

    #[test]
    fn test_remove() {
        let store = StateStore::new();
        store.set(id("sensor.a"), "1", HashMap::new());

        assert!(store.remove(&id("sensor.a")).is_some());
        assert!(store.remove(&id("sensor.a")).is_none());
        assert!(store.entity_ids("sensor").is_empty());
        assert!(store.all().is_empty());
    }
}
