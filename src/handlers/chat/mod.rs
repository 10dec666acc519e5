//! WebSocket chat relay handler
//!
//! Bridges an axum WebSocket to a [`ChatSession`](crate::core::relay::ChatSession):
//! incoming frames are mapped to [`ClientFrame`](crate::core::relay::ClientFrame)s
//! and outgoing events go through a bounded channel to a socket writer task.

mod handler;

pub use handler::chat_ws_handler;
