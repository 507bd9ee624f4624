//! Lifecycle of one websocket client
//!
//! Runs the auth handshake, then feeds text frames to the dispatcher.
//! Replies go through an mpsc channel drained by a dedicated send task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::AppState;

use super::dispatch::handle_message;
use super::types::{
    error_codes, AuthInvalidMessage, AuthOkMessage, AuthRequiredMessage, IncomingMessage,
    OutgoingMessage,
};

/// Time a client has to send its auth message
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// State of one authenticated client
pub struct ActiveConnection {
    pub state: AppState,
    /// Highest message id seen so far
    last_id: AtomicU64,
}

impl ActiveConnection {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            last_id: AtomicU64::new(0),
        }
    }

    /// Accept `id` only if it is above every id seen before
    pub fn validate_id(&self, id: u64) -> Result<(), &'static str> {
        self.last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |seen| {
                (id > seen).then_some(id)
            })
            .map(|_| ())
            .map_err(|_| error_codes::ID_REUSE)
    }
}

type Sender = SplitSink<WebSocket, Message>;
type Receiver = SplitStream<WebSocket>;

/// Drive one socket from handshake to close
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let host_version = env!("CARGO_PKG_VERSION");

    let greeting = OutgoingMessage::AuthRequired(AuthRequiredMessage {
        msg_type: "auth_required",
        ha_version: host_version.to_string(),
    });
    if let Err(e) = send_message(&mut sender, &greeting).await {
        error!("Could not greet client: {}", e);
        return;
    }

    match tokio::time::timeout(AUTH_TIMEOUT, wait_for_auth(&mut receiver)).await {
        Ok(Ok(AuthAttempt::Token(token))) if state.accepts_token(token.as_deref()) => {
            let accepted = OutgoingMessage::AuthOk(AuthOkMessage {
                msg_type: "auth_ok",
                ha_version: host_version.to_string(),
            });
            if let Err(e) = send_message(&mut sender, &accepted).await {
                error!("Could not confirm auth: {}", e);
                return;
            }
            info!("Client authenticated");
        }
        Ok(Ok(_)) => {
            reject_auth(&mut sender, "Invalid access token").await;
            return;
        }
        Ok(Err(reason)) => {
            warn!("Client went away before authenticating: {}", reason);
            return;
        }
        Err(_) => {
            reject_auth(&mut sender, "Authentication timeout").await;
            return;
        }
    }

    serve_authenticated(Arc::new(ActiveConnection::new(state)), sender, receiver).await;
}

/// Send `auth_invalid` and close the socket
async fn reject_auth(sender: &mut Sender, reason: &str) {
    let rejection = OutgoingMessage::AuthInvalid(AuthInvalidMessage {
        msg_type: "auth_invalid",
        message: reason.to_string(),
    });
    let _ = send_message(sender, &rejection).await;
    let _ = sender.close().await;
    warn!("Rejected client: {}", reason);
}

async fn serve_authenticated(
    conn: Arc<ActiveConnection>,
    mut sender: Sender,
    mut receiver: Receiver,
) {
    let (tx, mut rx) = mpsc::channel::<OutgoingMessage>(256);

    let writer = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            if send_message(&mut sender, &reply).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!("<- {}", text);
                if let Err(e) = handle_message(&conn, &text, &tx).await {
                    error!("Dispatch failed: {}", e);
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Socket read failed: {}", e);
                break;
            }
        }
    }

    drop(tx);
    let _ = writer.await;
    info!("Client disconnected");
}

/// First message received during the auth phase
enum AuthAttempt {
    Token(Option<String>),
    Unexpected,
}

/// Wait for the first text frame and classify it
async fn wait_for_auth(receiver: &mut Receiver) -> Result<AuthAttempt, String> {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                return Ok(match serde_json::from_str::<IncomingMessage>(&text) {
                    Ok(IncomingMessage::Auth { access_token }) => AuthAttempt::Token(access_token),
                    _ => AuthAttempt::Unexpected,
                });
            }
            Ok(Message::Close(_)) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
    }
    Err("socket closed".to_string())
}

/// Serialize and write one message
pub async fn send_message(sender: &mut Sender, msg: &OutgoingMessage) -> Result<(), String> {
    let text = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    debug!("-> {}", text);
    sender
        .send(Message::Text(text))
        .await
        .map_err(|e| e.to_string())
}
