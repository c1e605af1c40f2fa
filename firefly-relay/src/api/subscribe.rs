use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use firefly_core::StatusRecord;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tracing::{debug, warn};

use super::ApiState;
use crate::registry::{DeliveryError, StatusSink};

/// Subscriber endpoint. On connect the subscriber receives one snapshot of
/// the latest status, then one JSON record per broadcast cycle.
///
/// GET /subscribe (WebSocket upgrade)
pub async fn subscribe(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (tx, mut rx) = socket.split();
    let sink = Arc::new(WsSubscriber {
        tx: tokio::sync::Mutex::new(tx),
    });

    let id = match state.registry.register(Arc::clone(&sink) as _).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "subscriber dropped during initial snapshot");
            return;
        }
    };

    // Read side stays here: heartbeats are acknowledged, everything else is
    // noted and ignored. Disconnection surfaces as a read error or close.
    while let Some(message) = rx.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if text.as_str() == "ping" {
                    if sink.send_text("pong").await.is_err() {
                        break;
                    }
                } else {
                    debug!(subscriber = %id.0, message = %text.as_str(), "subscriber message ignored");
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state.registry.unregister(id).await;
}

/// One connected WebSocket subscriber's write half.
struct WsSubscriber {
    tx: tokio::sync::Mutex<SplitSink<WebSocket, Message>>,
}

impl WsSubscriber {
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        let mut tx = self.tx.lock().await;
        tx.send(Message::Text(text.into()))
            .await
            .map_err(|e| DeliveryError::Send(e.to_string()))
    }
}

#[async_trait]
impl StatusSink for WsSubscriber {
    async fn deliver(&self, record: &StatusRecord) -> Result<(), DeliveryError> {
        let payload =
            serde_json::to_string(record).map_err(|e| DeliveryError::Send(e.to_string()))?;
        self.send_text(&payload).await
    }
}
