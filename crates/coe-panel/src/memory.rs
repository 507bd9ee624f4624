//! In-memory host gateway
//!
//! Holds entries, stored configs and entity states in process. Used by
//! tests and for running the panel without a host.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use coe_core::{format_preview, split_domain, ConfigEntryMetadata, ExposedEntitiesConfig};
use tracing::debug;

use crate::gateway::{GatewayError, HostGateway};

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<ConfigEntryMetadata>,
    configs: HashMap<String, ExposedEntitiesConfig>,
    /// entity_id -> (state, unit)
    states: BTreeMap<String, (String, Option<String>)>,
    persisted: Vec<(String, ExposedEntitiesConfig)>,
    fail_persist: Option<GatewayError>,
}

/// Gateway backed by process memory
#[derive(Debug, Default)]
pub struct MemoryGateway {
    inner: RwLock<Inner>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_entry(&self, entry_id: impl Into<String>, title: impl Into<String>) {
        self.write()
            .entries
            .push(ConfigEntryMetadata::new(entry_id, title));
    }

    pub fn set_config(&self, entry_id: impl Into<String>, config: ExposedEntitiesConfig) {
        self.write().configs.insert(entry_id.into(), config);
    }

    pub fn set_state(
        &self,
        entity_id: impl Into<String>,
        state: impl Into<String>,
        unit: Option<&str>,
    ) {
        self.write().states.insert(
            entity_id.into(),
            (state.into(), unit.map(str::to_string)),
        );
    }

    /// Make every following persist call fail with `error`, or succeed again with `None`
    pub fn fail_persist_with(&self, error: Option<GatewayError>) {
        self.write().fail_persist = error;
    }

    /// Every successful persist call, oldest first
    pub fn persisted(&self) -> Vec<(String, ExposedEntitiesConfig)> {
        self.read().persisted.clone()
    }

    pub fn stored_config(&self, entry_id: &str) -> Option<ExposedEntitiesConfig> {
        self.read().configs.get(entry_id).cloned()
    }
}

#[async_trait]
impl HostGateway for MemoryGateway {
    async fn list_config_entries(&self) -> Vec<ConfigEntryMetadata> {
        self.read().entries.clone()
    }

    async fn fetch_config(&self, entry_id: &str) -> ExposedEntitiesConfig {
        self.read()
            .configs
            .get(entry_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn persist_config(
        &self,
        entry_id: &str,
        config: &ExposedEntitiesConfig,
    ) -> Result<(), GatewayError> {
        let mut inner = self.write();
        if let Some(error) = inner.fail_persist.clone() {
            return Err(error);
        }

        debug!("Persisting config for entry {}", entry_id);
        inner.configs.insert(entry_id.to_string(), config.clone());
        inner
            .persisted
            .push((entry_id.to_string(), config.clone()));
        Ok(())
    }

    async fn list_entity_identifiers(&self, domains: &[&str]) -> Vec<String> {
        self.read()
            .states
            .keys()
            .filter(|id| domains.contains(&split_domain(id)))
            .cloned()
            .collect()
    }

    async fn get_entity_preview(&self, entity_id: &str) -> Option<String> {
        self.read()
            .states
            .get(entity_id)
            .map(|(state, unit)| format_preview(state, unit.as_deref()))
    }
}
