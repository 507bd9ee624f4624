//! WebSocket message types

use coe_core::{ExposedEntitiesConfig, Slot};
use serde::{Deserialize, Serialize};

// =============================================================================
// Incoming Messages
// =============================================================================

/// Incoming WebSocket message from client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    Auth {
        #[serde(default)]
        access_token: Option<String>,
    },
    GetStates {
        id: u64,
    },
    Ping {
        id: u64,
    },
    #[serde(rename = "ta_coe/config/list")]
    CoeConfigList {
        id: u64,
    },
    #[serde(rename = "ta_coe/expose/info")]
    CoeExposeInfo {
        id: u64,
        config_entry_id: String,
    },
    #[serde(rename = "ta_coe/expose/update")]
    CoeExposeUpdate {
        id: u64,
        config_entry_id: String,
        config: ExposeUpdateConfig,
    },
}

/// `config` of an update request; unlike stored data, both channels must be sent
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExposeUpdateConfig {
    pub analog: Vec<Slot>,
    pub digital: Vec<Slot>,
}

impl From<ExposeUpdateConfig> for ExposedEntitiesConfig {
    fn from(config: ExposeUpdateConfig) -> Self {
        ExposedEntitiesConfig::new(config.analog, config.digital)
    }
}

impl IncomingMessage {
    /// Every `type` value this host understands
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "auth",
        coe_core::commands::GET_STATES,
        coe_core::commands::PING,
        coe_core::commands::CONFIG_LIST,
        coe_core::commands::EXPOSE_INFO,
        coe_core::commands::EXPOSE_UPDATE,
    ];
}

// =============================================================================
// Outgoing Messages
// =============================================================================

/// Outgoing WebSocket message to client
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    AuthRequired(AuthRequiredMessage),
    AuthOk(AuthOkMessage),
    AuthInvalid(AuthInvalidMessage),
    Pong(PongMessage),
    Result(ResultMessage),
}

#[derive(Debug, Serialize)]
pub struct AuthRequiredMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub ha_version: String,
}

#[derive(Debug, Serialize)]
pub struct AuthOkMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub ha_version: String,
}

#[derive(Debug, Serialize)]
pub struct AuthInvalidMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PongMessage {
    pub id: u64,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ResultMessage {
    pub id: u64,
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ResultMessage {
    pub fn success(id: u64, result: serde_json::Value) -> OutgoingMessage {
        OutgoingMessage::Result(Self {
            id,
            msg_type: "result",
            success: true,
            result: Some(result),
            error: None,
        })
    }

    pub fn error(id: u64, code: &str, message: impl Into<String>) -> OutgoingMessage {
        OutgoingMessage::Result(Self {
            id,
            msg_type: "result",
            success: false,
            result: None,
            error: Some(ErrorInfo {
                code: code.to_string(),
                message: message.into(),
            }),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

/// Error codes sent in failed results
pub mod error_codes {
    pub const ID_REUSE: &str = "id_reuse";
    pub const INVALID_FORMAT: &str = "invalid_format";
    pub const NOT_FOUND: &str = "not_found";
    pub const UNKNOWN_COMMAND: &str = "unknown_command";
    pub const UNKNOWN_ERROR: &str = "unknown_error";
}
