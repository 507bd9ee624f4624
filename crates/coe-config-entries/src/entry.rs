//! Config entry types
//!
//! A ConfigEntry is one configured instance of an integration. For the CoE
//! integration its `data` carries the exposed-entities mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ulid::Ulid;

use coe_core::ConfigEntryMetadata;

/// Where a config entry came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntrySource {
    #[default]
    User,
    Import,
    Discovery,
    Hassio,
    /// User chose to hide a discovery; never listed
    Ignore,
    Reconfigure,
}

/// Who switched an entry off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryDisabledBy {
    User,
}

/// One stored integration instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// ULID assigned at creation
    pub entry_id: String,

    /// Integration domain (e.g. "ta_coe")
    pub domain: String,

    /// Name shown in the panel picker
    pub title: String,

    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_version")]
    pub minor_version: u32,

    #[serde(default)]
    pub source: ConfigEntrySource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<ConfigEntryDisabledBy>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl ConfigEntry {
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entry_id: Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: HashMap::new(),
            options: HashMap::new(),
            version: 1,
            minor_version: 1,
            source: ConfigEntrySource::User,
            disabled_by: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_source(mut self, source: ConfigEntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_version(mut self, version: u32, minor_version: u32) -> Self {
        self.version = version;
        self.minor_version = minor_version;
        self
    }

    pub fn with_disabled_by(mut self, disabled_by: ConfigEntryDisabledBy) -> Self {
        self.disabled_by = Some(disabled_by);
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_by.is_some()
    }

    pub fn is_ignored(&self) -> bool {
        self.source == ConfigEntrySource::Ignore
    }

    /// Id and title as shown in the entry picker
    pub fn metadata(&self) -> ConfigEntryMetadata {
        ConfigEntryMetadata::new(&self.entry_id, &self.title)
    }
}
