use async_trait::async_trait;
use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info};

use crate::core::relay::{
    ChatMessageRoute, ChatOutgoingMessage, ChatSession, ClientFrame, EventSink, SinkClosed,
};
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Outgoing events buffered ahead of the socket writer
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Time the writer gets to flush the close frame
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
impl EventSink for mpsc::Sender<ChatMessageRoute> {
    async fn send(&mut self, message: ChatOutgoingMessage) -> Result<(), SinkClosed> {
        mpsc::Sender::send(self, ChatMessageRoute::Outgoing(message))
            .await
            .map_err(|_| SinkClosed)
    }

    async fn close(&mut self) {
        let _ = mpsc::Sender::send(self, ChatMessageRoute::Close).await;
    }
}

/// Releases the connection slot taken by the connection limit middleware.
struct ConnectionSlot {
    state: Arc<AppState>,
    ip: IpAddr,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.state.release_connection(self.ip);
    }
}

/// Chat WebSocket handler
///
/// Upgrades the connection and runs one chat session on it. The connection
/// slot is held until the socket closes, or released immediately if the
/// upgrade never completes.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
) -> Response {
    debug!(ip = %ip, "Chat WebSocket upgrade requested");

    let slot = ConnectionSlot {
        state: state.clone(),
        ip,
    };
    // Oversized messages must reach validation to be answered with input_error
    let frame_limit = state.relay.limits.max_frame_bytes();

    ws.max_frame_size(frame_limit)
        .max_message_size(frame_limit)
        .on_upgrade(move |socket| handle_chat_socket(socket, state, slot))
}

async fn handle_chat_socket(socket: WebSocket, app_state: Arc<AppState>, slot: ConnectionSlot) {
    info!(ip = %slot.ip, "Chat WebSocket connection established");

    let (mut sender, receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<ChatMessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing messages
    let mut sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let should_close = matches!(route, ChatMessageRoute::Close);

            let result = match route {
                ChatMessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                ChatMessageRoute::Close => sender.send(Message::Close(None)).await,
            };

            if let Err(e) = result {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }

            if should_close {
                break;
            }
        }
    });

    let incoming = receiver.map(|frame| match frame {
        Ok(Message::Text(text)) => ClientFrame::Text(text.as_str().to_owned()),
        Ok(Message::Binary(_)) => ClientFrame::Binary,
        Ok(Message::Ping(_) | Message::Pong(_)) => ClientFrame::Control,
        Ok(Message::Close(_)) => ClientFrame::Close,
        Err(e) => {
            debug!("Chat WebSocket read error: {}", e);
            ClientFrame::Close
        }
    });

    let session = ChatSession::new(app_state.relay.clone(), message_tx);
    session.run(incoming).await;

    // The session dropped its sender, so the writer exits once the queue drains
    if timeout(WRITER_DRAIN_TIMEOUT, &mut sender_task).await.is_err() {
        sender_task.abort();
    }

    info!(ip = %slot.ip, "Chat WebSocket connection terminated");
    drop(slot);
}
