//! Home Assistant style WebSocket API
//!
//! This module is organized into:
//! - `types` - Message type definitions
//! - `connection` - Connection handling and authentication
//! - `dispatch` - Message routing to handlers
//! - `handlers` - Individual command handlers

mod connection;
mod dispatch;
mod handlers;
mod types;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};

use crate::AppState;

pub use types::{ErrorInfo, IncomingMessage, OutgoingMessage, ResultMessage};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state))
}
