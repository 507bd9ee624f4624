//! WebSocket client for the CoE panel
//!
//! [`WsGateway`] implements the panel's `HostGateway` against a host that
//! speaks the Home Assistant websocket protocol.

mod error;
mod gateway;

pub use error::{ClientError, ClientResult};
pub use gateway::WsGateway;
