//! WebSocket message dispatch
//!
//! Routes incoming messages to the appropriate handler.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use super::connection::ActiveConnection;
use super::handlers;
use super::types::{error_codes, IncomingMessage, OutgoingMessage, PongMessage, ResultMessage};

/// Handle an incoming message
pub async fn handle_message(
    conn: &Arc<ActiveConnection>,
    text: &str,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> Result<(), String> {
    let msg: IncomingMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => return reject_unparsed(text, &e.to_string(), tx).await,
    };

    match msg {
        IncomingMessage::Auth { .. } => {
            // Already authenticated, ignore
            Ok(())
        }
        IncomingMessage::Ping { id } => {
            if !accept_id(conn, id, tx).await? {
                return Ok(());
            }
            let pong = OutgoingMessage::Pong(PongMessage {
                id,
                msg_type: "pong",
            });
            tx.send(pong).await.map_err(|e| e.to_string())
        }
        IncomingMessage::GetStates { id } => {
            if !accept_id(conn, id, tx).await? {
                return Ok(());
            }
            handlers::handle_get_states(conn, id, tx).await
        }
        IncomingMessage::CoeConfigList { id } => {
            if !accept_id(conn, id, tx).await? {
                return Ok(());
            }
            handlers::handle_config_list(conn, id, tx).await
        }
        IncomingMessage::CoeExposeInfo {
            id,
            config_entry_id,
        } => {
            if !accept_id(conn, id, tx).await? {
                return Ok(());
            }
            handlers::handle_expose_info(conn, id, &config_entry_id, tx).await
        }
        IncomingMessage::CoeExposeUpdate {
            id,
            config_entry_id,
            config,
        } => {
            if !accept_id(conn, id, tx).await? {
                return Ok(());
            }
            handlers::handle_expose_update(conn, id, &config_entry_id, config.into(), tx).await
        }
    }
}

/// Check the message id, answering `id_reuse` when it does not increase
async fn accept_id(
    conn: &ActiveConnection,
    id: u64,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> Result<bool, String> {
    match conn.validate_id(id) {
        Ok(()) => Ok(true),
        Err(code) => {
            warn!("Rejecting message id {}: {}", id, code);
            let result = ResultMessage::error(id, code, "Identifier values have to increase.");
            tx.send(result).await.map_err(|e| e.to_string())?;
            Ok(false)
        }
    }
}

/// Answer a message that failed to parse, if its id can be recovered
async fn reject_unparsed(
    text: &str,
    reason: &str,
    tx: &mpsc::Sender<OutgoingMessage>,
) -> Result<(), String> {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else {
        warn!("Dropping non-JSON message: {}", reason);
        return Ok(());
    };

    let msg_type = json.get("type").and_then(|t| t.as_str());
    let Some(id) = json.get("id").and_then(|i| i.as_u64()) else {
        warn!("Dropping message without id (type {:?}): {}", msg_type, reason);
        return Ok(());
    };

    let result = match msg_type {
        Some(t) if IncomingMessage::KNOWN_TYPES.contains(&t) => {
            ResultMessage::error(id, error_codes::INVALID_FORMAT, reason)
        }
        other => {
            warn!("Unhandled WebSocket message type: {:?}", other);
            ResultMessage::error(id, error_codes::UNKNOWN_COMMAND, "Unknown command.")
        }
    };
    tx.send(result).await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppState;
    use coe_config_entries::{ConfigEntries, Storage};
    use coe_state_store::StateStore;
    use tempfile::TempDir;

    fn connection(dir: &TempDir) -> Arc<ActiveConnection> {
        Arc::new(ActiveConnection::new(AppState::new(
            Arc::new(ConfigEntries::new(Arc::new(Storage::new(dir.path())))),
            Arc::new(StateStore::new()),
        )))
    }

    async fn reply(conn: &Arc<ActiveConnection>, text: &str) -> serde_json::Value {
        let (tx, mut rx) = mpsc::channel(8);
        handle_message(conn, text, &tx).await.unwrap();
        drop(tx);
        serde_json::to_value(rx.recv().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let dir = TempDir::new().unwrap();
        let conn = connection(&dir);
        let msg = reply(&conn, r#"{"id": 1, "type": "ping"}"#).await;
        assert_eq!(msg, serde_json::json!({"id": 1, "type": "pong"}));
    }

    #[tokio::test]
    async fn test_id_reuse() {
        let dir = TempDir::new().unwrap();
        let conn = connection(&dir);
        reply(&conn, r#"{"id": 3, "type": "ping"}"#).await;

        let msg = reply(&conn, r#"{"id": 3, "type": "ping"}"#).await;
        assert_eq!(msg["success"], false);
        assert_eq!(msg["error"]["code"], "id_reuse");
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let dir = TempDir::new().unwrap();
        let conn = connection(&dir);
        let msg = reply(&conn, r#"{"id": 1, "type": "lights/explode"}"#).await;
        assert_eq!(msg["id"], 1);
        assert_eq!(msg["error"]["code"], "unknown_command");
    }

    #[tokio::test]
    async fn test_malformed_known_command() {
        let dir = TempDir::new().unwrap();
        let conn = connection(&dir);
        let msg = reply(&conn, r#"{"id": 2, "type": "ta_coe/expose/info"}"#).await;
        assert_eq!(msg["error"]["code"], "invalid_format");
    }

    #[tokio::test]
    async fn test_update_requires_both_channels() {
        let dir = TempDir::new().unwrap();
        let conn = connection(&dir);

        let msg = reply(
            &conn,
            r#"{"id": 1, "type": "ta_coe/expose/update", "config_entry_id": "e1",
                "config": {"analog": [{"id": 1, "entity_id": "sensor.a"}]}}"#,
        )
        .await;
        assert_eq!(msg["id"], 1);
        assert_eq!(msg["error"]["code"], "invalid_format");
        assert!(msg["error"]["message"].as_str().unwrap().contains("digital"));

        let msg = reply(
            &conn,
            r#"{"id": 2, "type": "ta_coe/expose/update", "config_entry_id": "e1",
                "config": {"digital": []}}"#,
        )
        .await;
        assert_eq!(msg["error"]["code"], "invalid_format");
    }

    #[tokio::test]
    async fn test_update_with_both_channels_reaches_handler() {
        let dir = TempDir::new().unwrap();
        let conn = connection(&dir);

        let msg = reply(
            &conn,
            r#"{"id": 1, "type": "ta_coe/expose/update", "config_entry_id": "e1",
                "config": {"analog": [], "digital": []}}"#,
        )
        .await;
        assert_eq!(msg["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_message_without_id_is_dropped() {
        let dir = TempDir::new().unwrap();
        let conn = connection(&dir);
        let (tx, mut rx) = mpsc::channel(8);

        handle_message(&conn, r#"{"type": "nope"}"#, &tx).await.unwrap();
        handle_message(&conn, "not json", &tx).await.unwrap();
        drop(tx);

        assert!(rx.recv().await.is_none());
    }
}
