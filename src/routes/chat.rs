//! Chat WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::chat_ws_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the chat WebSocket router
///
/// # Endpoint
///
/// `GET /ws/chat` - WebSocket upgrade for the chat relay
///
/// # Protocol
///
/// The server greets every connection with `session_created`. Clients then
/// send one message per turn:
///
/// ```json
/// {"type": "user_message", "text": "Hello", "instructions": "Keep it short."}
/// ```
///
/// and receive zero or more `chunk` events followed by exactly one `done`
/// (with `full_text`, `ttft_ms` and `total_ms`) or `error` (with `code` and
/// `message`).
///
/// The route must be layered with
/// [`connection_limit_middleware`](crate::middleware::connection_limit_middleware),
/// which supplies the client address to the handler.
pub fn create_chat_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/chat", get(chat_ws_handler))
        .layer(TraceLayer::new_for_http())
}
