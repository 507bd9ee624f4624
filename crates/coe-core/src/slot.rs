//! Slot, channel and exposed-entities configuration types

use serde::{Deserialize, Serialize};
use std::fmt;

/// One numbered assignment within a channel
///
/// An empty `entity_id` marks an unassigned slot. Unassigned slots only
/// exist in the editable (dense) view and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub id: u32,
    pub entity_id: String,
}

impl Slot {
    pub fn new(id: u32, entity_id: impl Into<String>) -> Self {
        Self {
            id,
            entity_id: entity_id.into(),
        }
    }

    /// Placeholder for an unassigned slot
    pub fn empty(id: u32) -> Self {
        Self {
            id,
            entity_id: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entity_id.is_empty()
    }
}

/// The two independent slot categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Analog,
    Digital,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Analog, Channel::Digital];

    /// Config key used for this channel in stored entry data
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Analog => crate::CONF_ANALOG_ENTITIES,
            Channel::Digital => crate::CONF_DIGITAL_ENTITIES,
        }
    }

    /// Entity domains whose entities can be assigned to this channel
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Channel::Analog => crate::domains::ANALOG_DOMAINS,
            Channel::Digital => crate::domains::DIGITAL_DOMAINS,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot assignments for both channels of one config entry
///
/// JSON shape: `{"analog": [{"id": 1, "entity_id": "sensor.x"}], "digital": []}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedEntitiesConfig {
    #[serde(default)]
    pub analog: Vec<Slot>,
    #[serde(default)]
    pub digital: Vec<Slot>,
}

impl ExposedEntitiesConfig {
    pub fn new(analog: Vec<Slot>, digital: Vec<Slot>) -> Self {
        Self { analog, digital }
    }

    pub fn channel(&self, channel: Channel) -> &[Slot] {
        match channel {
            Channel::Analog => &self.analog,
            Channel::Digital => &self.digital,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut Vec<Slot> {
        match channel {
            Channel::Analog => &mut self.analog,
            Channel::Digital => &mut self.digital,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.analog.is_empty() && self.digital.is_empty()
    }

    /// Apply a transformation to both channels
    pub fn map_channels(&self, f: impl Fn(&[Slot]) -> Vec<Slot>) -> Self {
        Self {
            analog: f(&self.analog),
            digital: f(&self.digital),
        }
    }
}

/// Identifier and display title of a config entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntryMetadata {
    pub entry_id: String,
    pub title: String,
}

impl ConfigEntryMetadata {
    pub fn new(entry_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: title.into(),
        }
    }
}
