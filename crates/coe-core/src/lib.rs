//! Core types for the CoE exposed-entities panel
//!
//! This crate provides the types shared by the panel, the host API and the
//! client: EntityId, Slot, Channel, ExposedEntitiesConfig and State.

pub mod domains;
mod entity_id;
mod slot;
mod state;

pub use entity_id::{is_valid_entity_id, split_domain, EntityId, EntityIdError};
pub use slot::{Channel, ConfigEntryMetadata, ExposedEntitiesConfig, Slot};
pub use state::{format_preview, State, ATTR_UNIT_OF_MEASUREMENT};

/// Integration domain owning the config entries
pub const DOMAIN: &str = "ta_coe";

/// Hard cap on the number of slots per channel
pub const MAX_SLOTS: usize = 60;

/// Entry data key holding the exposed-entities configuration
pub const CONF_ENTITIES_TO_SEND: &str = "entities_to_send";
pub const CONF_ANALOG_ENTITIES: &str = "analog";
pub const CONF_DIGITAL_ENTITIES: &str = "digital";

/// Legacy markers reserving a slot without an entity
pub const FREE_SLOT_MARKER_ANALOG: &str = "--FREE_SLOT_MARKER_A--";
pub const FREE_SLOT_MARKER_DIGITAL: &str = "--FREE_SLOT_MARKER_D--";

/// Shown when no preview value is available for an entity
pub const DEFAULT_PREVIEW: &str = "---";

/// WebSocket command types served by the host
pub mod commands {
    pub const CONFIG_LIST: &str = "ta_coe/config/list";
    pub const EXPOSE_INFO: &str = "ta_coe/expose/info";
    pub const EXPOSE_UPDATE: &str = "ta_coe/expose/update";
    pub const GET_STATES: &str = "get_states";
    pub const PING: &str = "ping";
}
