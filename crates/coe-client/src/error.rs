//! Client error types

use coe_panel::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("authentication rejected: {0}")]
    AuthInvalid(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection closed by host")]
    Closed,

    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("unexpected message: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("command failed ({code}): {message}")]
    Command { code: String, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether the connection must be dropped after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ClientError::Command { .. } | ClientError::Json(_))
    }
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Command { code, message } => GatewayError::Rejected { code, message },
            ClientError::Connect { .. } | ClientError::AuthInvalid(_) => GatewayError::NotConnected,
            other => GatewayError::Transport(other.to_string()),
        }
    }
}
