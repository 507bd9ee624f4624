//! WebSocket host API for the CoE panel
//!
//! Speaks the Home Assistant websocket protocol for the small command set
//! the panel needs: `ta_coe/config/list`, `ta_coe/expose/info`,
//! `ta_coe/expose/update`, `get_states` and `ping`.

mod websocket;

use axum::{routing::get, Router};
use coe_config_entries::ConfigEntries;
use coe_state_store::StateStore;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use websocket::{ErrorInfo, IncomingMessage, OutgoingMessage, ResultMessage};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config_entries: Arc<ConfigEntries>,
    pub states: Arc<StateStore>,
    /// Token clients must present; `None` accepts any token
    pub access_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(config_entries: Arc<ConfigEntries>, states: Arc<StateStore>) -> Self {
        Self {
            config_entries,
            states,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<Arc<str>>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Check a presented token against the configured one
    pub fn accepts_token(&self, token: Option<&str>) -> bool {
        match &self.access_token {
            None => true,
            Some(expected) => token == Some(&**expected),
        }
    }
}

/// Create the router serving `/api/websocket`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/websocket", get(websocket::ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
