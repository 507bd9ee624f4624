//! Config session state
//!
//! A [`ConfigSession`] owns the selected config entry and the dense,
//! editable slot lists of both channels. It mediates every load and save
//! against the injected [`HostGateway`].

use coe_core::{
    Channel, ConfigEntryMetadata, ExposedEntitiesConfig, Slot, DEFAULT_PREVIEW, MAX_SLOTS,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::events::{SessionEvent, SessionEvents, SAVED_NOTICE};
use crate::gateway::{GatewayError, HostGateway};
use crate::slots::{densify, is_dense, sparsify};

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to save config for entry {entry_id}: {source}")]
    Persist {
        entry_id: String,
        #[source]
        source: GatewayError,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What a call to [`ConfigSession::save`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing is selected, the host was not contacted
    NoSelection,
    Saved,
}

/// Editable state of the panel
pub struct ConfigSession<G> {
    gateway: G,
    entries: Vec<ConfigEntryMetadata>,
    entry_id: Option<String>,
    config: ExposedEntitiesConfig,
    analog_choices: Vec<String>,
    digital_choices: Vec<String>,
    events: SessionEvents,
}

impl<G: HostGateway> ConfigSession<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            entries: Vec::new(),
            entry_id: None,
            config: ExposedEntitiesConfig::default(),
            analog_choices: Vec::new(),
            digital_choices: Vec::new(),
            events: SessionEvents::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn entries(&self) -> &[ConfigEntryMetadata] {
        &self.entries
    }

    pub fn selected_entry(&self) -> Option<&str> {
        self.entry_id.as_deref()
    }

    /// The dense, editable state of both channels
    pub fn config(&self) -> &ExposedEntitiesConfig {
        &self.config
    }

    pub fn slots(&self, channel: Channel) -> &[Slot] {
        self.config.channel(channel)
    }

    pub fn slot_count(&self, channel: Channel) -> usize {
        self.config.channel(channel).len()
    }

    pub fn can_add_slot(&self, channel: Channel) -> bool {
        self.slot_count(channel) < MAX_SLOTS
    }

    /// Candidate entity ids for a channel, see [`refresh_entity_choices`](Self::refresh_entity_choices)
    pub fn entity_choices(&self, channel: Channel) -> &[String] {
        match channel {
            Channel::Analog => &self.analog_choices,
            Channel::Digital => &self.digital_choices,
        }
    }

    /// Load the selectable entries and select the first one.
    ///
    /// Returns the number of entries found.
    pub async fn load_entries(&mut self) -> usize {
        self.entries = self.gateway.list_config_entries().await;
        let count = self.entries.len();
        info!("Found {} config entries", count);
        self.events.emit(SessionEvent::EntriesLoaded { count });

        if let Some(first) = self.entries.first().map(|e| e.entry_id.clone()) {
            self.select_entry(Some(first)).await;
        }
        count
    }

    /// Change the active entry and load its slots.
    ///
    /// `None` clears the selection and the editable state without contacting
    /// the host.
    pub async fn select_entry(&mut self, entry_id: Option<String>) {
        self.entry_id = entry_id.clone();
        self.events.emit(SessionEvent::EntrySelected {
            entry_id: entry_id.clone(),
        });

        let Some(entry_id) = entry_id else {
            self.config = ExposedEntitiesConfig::default();
            return;
        };

        let mut fetched = self.gateway.fetch_config(&entry_id).await;
        // densify takes its bound from the last slot
        fetched.analog.sort_by_key(|s| s.id);
        fetched.digital.sort_by_key(|s| s.id);

        self.config = fetched.map_channels(densify);
        debug!(
            "Loaded entry {}: {} analog, {} digital slots",
            entry_id,
            self.config.analog.len(),
            self.config.digital.len()
        );
        self.events.emit(SessionEvent::ConfigLoaded { entry_id });
    }

    /// Replace the slot at position `slot.id - 1`.
    ///
    /// The channel must be dense and `slot.id` within it. Debug builds
    /// panic otherwise, release builds ignore the call.
    pub fn update_slot(&mut self, channel: Channel, slot: Slot) {
        let slots = self.config.channel_mut(channel);
        debug_assert!(is_dense(slots), "{channel} slots are not dense");

        let index = (slot.id as usize).wrapping_sub(1);
        match slots.get_mut(index) {
            Some(current) => {
                debug_assert_eq!(current.id, slot.id, "slot id does not match its position");
                *current = slot;
            }
            None => {
                if cfg!(debug_assertions) {
                    panic!("slot id {} outside 1..={} of {channel}", slot.id, slots.len());
                }
                warn!(
                    "Ignoring update of {} slot {}: only {} slots",
                    channel,
                    slot.id,
                    slots.len()
                );
                return;
            }
        }

        self.events.emit(SessionEvent::SlotsChanged { channel });
    }

    /// Append an empty slot unless the channel is full
    pub fn add_slot(&mut self, channel: Channel) {
        if !self.can_add_slot(channel) {
            debug!("{} already has {} slots", channel, MAX_SLOTS);
            return;
        }

        let slots = self.config.channel_mut(channel);
        let id = slots.len() as u32 + 1;
        slots.push(Slot::empty(id));
        self.events.emit(SessionEvent::SlotsChanged { channel });
    }

    /// Drop the last slot of a channel
    pub fn remove_last_slot(&mut self, channel: Channel) {
        if self.config.channel_mut(channel).pop().is_some() {
            self.events.emit(SessionEvent::SlotsChanged { channel });
        }
    }

    /// Persist the assigned slots of both channels.
    ///
    /// Unassigned slots are stripped first. On failure the editable state is
    /// kept so the user can retry.
    pub async fn save(&mut self) -> SessionResult<SaveOutcome> {
        let Some(entry_id) = self.entry_id.clone() else {
            return Ok(SaveOutcome::NoSelection);
        };

        let persisted = self.config.map_channels(sparsify);
        self.gateway
            .persist_config(&entry_id, &persisted)
            .await
            .map_err(|source| SessionError::Persist {
                entry_id: entry_id.clone(),
                source,
            })?;

        info!(
            "Saved entry {}: {} analog, {} digital entities",
            entry_id,
            persisted.analog.len(),
            persisted.digital.len()
        );
        self.events.emit(SessionEvent::Saved { entry_id });
        self.events.notice(SAVED_NOTICE);
        Ok(SaveOutcome::Saved)
    }

    /// Reload the candidate entity ids of both channels
    pub async fn refresh_entity_choices(&mut self) {
        self.analog_choices = self
            .gateway
            .list_entity_identifiers(Channel::Analog.domains())
            .await;
        self.digital_choices = self
            .gateway
            .list_entity_identifiers(Channel::Digital.domains())
            .await;
        debug!(
            "Entity choices: {} analog, {} digital",
            self.analog_choices.len(),
            self.digital_choices.len()
        );
    }

    /// Display value of an entity, `---` when unknown
    pub async fn preview(&self, entity_id: &str) -> String {
        if entity_id.is_empty() {
            return DEFAULT_PREVIEW.to_string();
        }
        self.gateway
            .get_entity_preview(entity_id)
            .await
            .unwrap_or_else(|| DEFAULT_PREVIEW.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryGateway;
    use std::sync::Arc;

    fn session_with_entry() -> ConfigSession<Arc<MemoryGateway>> {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.add_entry("e1", "Kitchen");
        ConfigSession::new(gateway)
    }

    #[tokio::test]
    async fn test_select_none_does_not_load() {
        let mut session = session_with_entry();
        session
            .gateway()
            .set_config("e1", ExposedEntitiesConfig::new(vec![Slot::new(1, "sensor.a")], vec![]));

        session.select_entry(Some("e1".into())).await;
        assert_eq!(session.slot_count(Channel::Analog), 1);

        session.select_entry(None).await;
        assert_eq!(session.selected_entry(), None);
        assert!(session.config().is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_entry_is_empty() {
        let mut session = session_with_entry();
        session.select_entry(Some("missing".into())).await;
        assert_eq!(session.selected_entry(), Some("missing"));
        assert!(session.config().is_empty());
    }

    #[tokio::test]
    async fn test_select_sorts_before_densify() {
        let mut session = session_with_entry();
        session.gateway().set_config(
            "e1",
            ExposedEntitiesConfig::new(
                vec![Slot::new(4, "sensor.d"), Slot::new(2, "sensor.b")],
                vec![],
            ),
        );

        session.select_entry(Some("e1".into())).await;

        assert_eq!(
            session.slots(Channel::Analog),
            &[
                Slot::empty(1),
                Slot::new(2, "sensor.b"),
                Slot::empty(3),
                Slot::new(4, "sensor.d"),
            ]
        );
    }

    #[tokio::test]
    async fn test_add_slot_stops_at_cap() {
        let mut session = session_with_entry();
        for _ in 0..MAX_SLOTS {
            session.add_slot(Channel::Digital);
        }
        assert_eq!(session.slot_count(Channel::Digital), MAX_SLOTS);
        assert!(!session.can_add_slot(Channel::Digital));

        session.add_slot(Channel::Digital);
        assert_eq!(session.slot_count(Channel::Digital), MAX_SLOTS);
        assert_eq!(session.slots(Channel::Digital).last().unwrap().id, 60);
    }

    #[tokio::test]
    async fn test_remove_last_slot() {
        let mut session = session_with_entry();
        session.remove_last_slot(Channel::Analog);
        assert_eq!(session.slot_count(Channel::Analog), 0);

        session.add_slot(Channel::Analog);
        session.add_slot(Channel::Analog);
        session.remove_last_slot(Channel::Analog);
        assert_eq!(session.slots(Channel::Analog), &[Slot::empty(1)]);
    }

    #[tokio::test]
    async fn test_update_slot_by_position() {
        let mut session = session_with_entry();
        session.add_slot(Channel::Analog);
        session.add_slot(Channel::Analog);

        session.update_slot(Channel::Analog, Slot::new(2, "sensor.b"));

        assert_eq!(
            session.slots(Channel::Analog),
            &[Slot::empty(1), Slot::new(2, "sensor.b")]
        );
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    #[should_panic(expected = "outside")]
    async fn test_update_slot_out_of_range_panics_in_debug() {
        let mut session = session_with_entry();
        session.add_slot(Channel::Analog);
        session.update_slot(Channel::Analog, Slot::new(5, "sensor.e"));
    }

    #[tokio::test]
    async fn test_save_without_selection_skips_host() {
        let mut session = session_with_entry();
        session.add_slot(Channel::Analog);

        assert_eq!(session.save().await.unwrap(), SaveOutcome::NoSelection);
        assert!(session.gateway().persisted().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_keeps_edits() {
        let mut session = session_with_entry();
        session.select_entry(Some("e1".into())).await;
        session.add_slot(Channel::Digital);
        session.update_slot(Channel::Digital, Slot::new(1, "binary_sensor.pump"));
        session.gateway().fail_persist_with(Some(GatewayError::Rejected {
            code: "invalid_format".into(),
            message: "bad".into(),
        }));

        let err = session.save().await.unwrap_err();
        assert!(matches!(err, SessionError::Persist { ref entry_id, .. } if entry_id == "e1"));
        assert_eq!(
            session.slots(Channel::Digital),
            &[Slot::new(1, "binary_sensor.pump")]
        );

        session.gateway().fail_persist_with(None);
        assert_eq!(session.save().await.unwrap(), SaveOutcome::Saved);
    }

    #[tokio::test]
    async fn test_preview_fallback() {
        let session = session_with_entry();
        session.gateway().set_state("sensor.temp", "20.5", Some("°C"));

        assert_eq!(session.preview("sensor.temp").await, "20.5 °C");
        assert_eq!(session.preview("sensor.unknown").await, DEFAULT_PREVIEW);
        assert_eq!(session.preview("").await, DEFAULT_PREVIEW);
    }
}
