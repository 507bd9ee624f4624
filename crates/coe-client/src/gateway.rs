//! [`HostGateway`] over the host websocket API

use std::time::Duration;

use async_trait::async_trait;
use coe_config::ClientConfig;
use coe_core::{
    commands, split_domain, ConfigEntryMetadata, ExposedEntitiesConfig, State,
};
use coe_panel::{GatewayError, HostGateway};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An authenticated socket and the next message id to use
struct Connection {
    socket: Socket,
    next_id: u64,
}

/// Gateway talking to a host over one lazily opened websocket
///
/// Requests are serialized on the socket. A transport failure drops the
/// connection; the next request reconnects.
pub struct WsGateway {
    ws_url: String,
    access_token: String,
    request_timeout: Duration,
    connection: Mutex<Option<Connection>>,
}

#[derive(Debug, Deserialize)]
struct EntryList {
    entries: Vec<ConfigEntryMetadata>,
}

#[derive(Debug, Deserialize)]
struct ExposeInfo {
    #[serde(default)]
    config: ExposedEntitiesConfig,
}

impl WsGateway {
    /// `url` is the host base URL, e.g. `http://127.0.0.1:8123`
    pub fn new(url: &str, access_token: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            ws_url: ws_url(url),
            access_token: access_token.into(),
            request_timeout,
            connection: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            &config.url,
            config.access_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Round-trip a ping
    pub async fn ping(&self) -> ClientResult<()> {
        self.call(json!({ "type": commands::PING })).await.map(|_| ())
    }

    /// Send one command and wait for its reply
    ///
    /// Returns the `result` payload of a successful reply.
    pub async fn call(&self, mut payload: Value) -> ClientResult<Value> {
        let mut guard = self.connection.lock().await;

        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(ClientError::Closed);
        };

        let id = conn.next_id;
        conn.next_id += 1;
        payload["id"] = json!(id);

        let outcome = timeout(self.request_timeout, exchange(&mut conn.socket, id, &payload))
            .await
            .unwrap_or(Err(ClientError::Timeout));

        if let Err(e) = &outcome {
            if e.is_fatal() {
                warn!("Dropping host connection: {}", e);
                *guard = None;
            }
        }
        outcome
    }

    async fn connect(&self) -> ClientResult<Connection> {
        debug!("Connecting to {}", self.ws_url);

        let (mut socket, _) = timeout(self.request_timeout, connect_async(self.ws_url.as_str()))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|e| ClientError::Connect {
                url: self.ws_url.clone(),
                reason: e.to_string(),
            })?;

        timeout(
            self.request_timeout,
            authenticate(&mut socket, &self.access_token),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        info!("Connected to host at {}", self.ws_url);
        Ok(Connection { socket, next_id: 1 })
    }

    async fn states(&self) -> ClientResult<Vec<State>> {
        let result = self.call(json!({ "type": commands::GET_STATES })).await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl HostGateway for WsGateway {
    async fn list_config_entries(&self) -> Vec<ConfigEntryMetadata> {
        let result = self.call(json!({ "type": commands::CONFIG_LIST })).await;
        match result.and_then(|v| Ok(serde_json::from_value::<EntryList>(v)?)) {
            Ok(list) => list.entries,
            Err(e) => {
                warn!("Failed to list config entries: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_config(&self, entry_id: &str) -> ExposedEntitiesConfig {
        let result = self
            .call(json!({ "type": commands::EXPOSE_INFO, "config_entry_id": entry_id }))
            .await;
        match result.and_then(|v| Ok(serde_json::from_value::<ExposeInfo>(v)?)) {
            Ok(info) => info.config,
            Err(e) => {
                warn!("Failed to fetch config of {}: {}", entry_id, e);
                ExposedEntitiesConfig::default()
            }
        }
    }

    async fn persist_config(
        &self,
        entry_id: &str,
        config: &ExposedEntitiesConfig,
    ) -> Result<(), GatewayError> {
        self.call(json!({
            "type": commands::EXPOSE_UPDATE,
            "config_entry_id": entry_id,
            "config": config,
        }))
        .await
        .map(|_| ())
        .map_err(GatewayError::from)
    }

    async fn list_entity_identifiers(&self, domains: &[&str]) -> Vec<String> {
        match self.states().await {
            Ok(states) => {
                let mut ids: Vec<String> = states
                    .into_iter()
                    .map(|s| s.entity_id.to_string())
                    .filter(|id| domains.contains(&split_domain(id)))
                    .collect();
                ids.sort();
                ids
            }
            Err(e) => {
                warn!("Failed to list entities: {}", e);
                Vec::new()
            }
        }
    }

    async fn get_entity_preview(&self, entity_id: &str) -> Option<String> {
        match self.states().await {
            Ok(states) => states
                .into_iter()
                .find(|s| s.entity_id.to_string() == entity_id)
                .map(|s| s.preview()),
            Err(e) => {
                warn!("Failed to read state of {}: {}", entity_id, e);
                None
            }
        }
    }
}

/// Run the auth handshake on a fresh socket
async fn authenticate(socket: &mut Socket, access_token: &str) -> ClientResult<()> {
    let first = recv_json(socket).await?;
    if message_type(&first) != Some("auth_required") {
        return Err(ClientError::Protocol(first.to_string()));
    }

    let auth = json!({ "type": "auth", "access_token": access_token });
    socket.send(Message::Text(auth.to_string())).await?;

    let reply = recv_json(socket).await?;
    match message_type(&reply) {
        Some("auth_ok") => Ok(()),
        Some("auth_invalid") => Err(ClientError::AuthInvalid(
            reply["message"].as_str().unwrap_or_default().to_string(),
        )),
        _ => Err(ClientError::Protocol(reply.to_string())),
    }
}

/// Send a request and read until the reply carrying `id` arrives
async fn exchange(socket: &mut Socket, id: u64, payload: &Value) -> ClientResult<Value> {
    socket.send(Message::Text(payload.to_string())).await?;

    loop {
        let msg = recv_json(socket).await?;
        if msg["id"].as_u64() != Some(id) {
            debug!("Skipping unrelated message: {}", msg);
            continue;
        }

        return match message_type(&msg) {
            Some("pong") => Ok(Value::Null),
            Some("result") if msg["success"].as_bool() == Some(true) => {
                Ok(msg.get("result").cloned().unwrap_or(Value::Null))
            }
            Some("result") => Err(ClientError::Command {
                code: msg["error"]["code"].as_str().unwrap_or("unknown_error").to_string(),
                message: msg["error"]["message"].as_str().unwrap_or_default().to_string(),
            }),
            _ => Err(ClientError::Protocol(msg.to_string())),
        };
    }
}

/// Next text frame parsed as JSON
async fn recv_json(socket: &mut Socket) -> ClientResult<Value> {
    while let Some(frame) = socket.next().await {
        match frame? {
            Message::Text(text) => return Ok(serde_json::from_str(&text)?),
            Message::Close(_) => return Err(ClientError::Closed),
            _ => {}
        }
    }
    Err(ClientError::Closed)
}

fn message_type(msg: &Value) -> Option<&str> {
    msg.get("type").and_then(|t| t.as_str())
}

/// WebSocket endpoint for a host base URL
fn ws_url(base_url: &str) -> String {
    let url = base_url
        .trim_end_matches('/')
        .replace("http://", "ws://")
        .replace("https://", "wss://");
    format!("{}/api/websocket", url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url() {
        assert_eq!(
            ws_url("http://127.0.0.1:8123/"),
            "ws://127.0.0.1:8123/api/websocket"
        );
        assert_eq!(
            ws_url("https://hass.example"),
            "wss://hass.example/api/websocket"
        );
    }

    #[test]
    fn test_from_config() {
        let config = ClientConfig {
            url: "http://localhost:9000".to_string(),
            access_token: "token".to_string(),
            request_timeout_secs: 3,
        };
        let gateway = WsGateway::from_config(&config);
        assert_eq!(gateway.ws_url(), "ws://localhost:9000/api/websocket");
        assert_eq!(gateway.request_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unreachable_host_degrades_reads() {
        // Port 9 (discard) is closed on test machines
        let gateway = WsGateway::new("http://127.0.0.1:9", "", Duration::from_secs(2));

        assert!(gateway.list_config_entries().await.is_empty());
        assert!(gateway.fetch_config("x").await.is_empty());
        assert_eq!(gateway.get_entity_preview("sensor.a").await, None);
        assert_eq!(
            gateway
                .persist_config("x", &ExposedEntitiesConfig::default())
                .await,
            Err(GatewayError::NotConnected)
        );
    }
}
