//! Session change notifications
//!
//! Every mutating session operation publishes a [`SessionEvent`] so a
//! presentation layer can re-render. Events are fire-and-forget: sending
//! with no subscriber is not an error.

use std::time::Duration;

use coe_core::Channel;
use tokio::sync::broadcast;
use tracing::trace;

/// Default channel capacity for session subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// How long the save confirmation stays visible
pub const NOTICE_DURATION: Duration = Duration::from_secs(5);

/// Text of the save confirmation
pub const SAVED_NOTICE: &str = "Config updated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The list of selectable entries was (re)loaded
    EntriesLoaded { count: usize },
    /// The active entry changed
    EntrySelected { entry_id: Option<String> },
    /// The editable state of the active entry was replaced
    ConfigLoaded { entry_id: String },
    /// Slots of one channel were edited
    SlotsChanged { channel: Channel },
    /// The editable state was persisted
    Saved { entry_id: String },
    /// Transient message for the user
    Notice { message: String, duration: Duration },
}

/// Broadcast publisher owned by the session
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        trace!(?event, "Session event");
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn notice(&self, message: impl Into<String>) {
        self.emit(SessionEvent::Notice {
            message: message.into(),
            duration: NOTICE_DURATION,
        });
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
