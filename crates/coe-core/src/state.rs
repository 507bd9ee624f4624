//! State type representing an entity's current value

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EntityId;

/// Attribute holding the unit shown next to a state value
pub const ATTR_UNIT_OF_MEASUREMENT: &str = "unit_of_measurement";

/// The state of an entity at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub entity_id: EntityId,

    /// The state value (e.g. "on", "21.5", "unavailable")
    pub state: String,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the value last differed from the previous one
    pub last_changed: DateTime<Utc>,

    /// When the state was last written
    pub last_updated: DateTime<Utc>,
}

impl State {
    pub fn new(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            state: state.into(),
            attributes,
            last_changed: now,
            last_updated: now,
        }
    }

    /// Create an updated state, preserving last_changed if the value is the same
    pub fn with_update(
        &self,
        new_state: impl Into<String>,
        new_attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        let new_state = new_state.into();
        let changed = self.state != new_state;

        Self {
            entity_id: self.entity_id.clone(),
            state: new_state,
            attributes: new_attributes,
            last_changed: if changed { now } else { self.last_changed },
            last_updated: now,
        }
    }

    pub fn unit_of_measurement(&self) -> Option<&str> {
        self.attributes
            .get(ATTR_UNIT_OF_MEASUREMENT)
            .and_then(|v| v.as_str())
    }

    /// Human-readable value such as `21.5 °C`, or `on` when there is no unit
    pub fn preview(&self) -> String {
        format_preview(&self.state, self.unit_of_measurement())
    }
}

/// Format a state value with an optional unit
pub fn format_preview(state: &str, unit: Option<&str>) -> String {
    format!("{} {}", state, unit.unwrap_or_default())
        .trim()
        .to_string()
}
