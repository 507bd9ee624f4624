//! Headless core of the CoE exposed-entities panel
//!
//! - [`slots`] converts between the sparse stored slot lists and the dense
//!   lists the editor works on.
//! - [`ConfigSession`] owns the selected config entry and its editable
//!   slots, and loads/saves them through a [`HostGateway`].
//!
//! # Example
//!
//! ```ignore
//! let mut session = ConfigSession::new(gateway);
//! session.load_entries().await;
//! session.update_slot(Channel::Analog, Slot::new(1, "sensor.humidity"));
//! session.save().await?;
//! ```

pub mod events;
pub mod gateway;
pub mod memory;
pub mod session;
pub mod slots;

pub use events::{SessionEvent, SessionEvents, NOTICE_DURATION, SAVED_NOTICE};
pub use gateway::{GatewayError, HostGateway};
pub use memory::MemoryGateway;
pub use session::{ConfigSession, SaveOutcome, SessionError, SessionResult};
pub use slots::{densify, is_dense, sparsify};
