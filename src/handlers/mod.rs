//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check and the chat page
//! - `chat` - WebSocket chat relay
//! - `speech` - Transcription and synthesis REST API
//! - `usage` - Usage record inspection

pub mod api;
pub mod chat;
pub mod speech;
pub mod usage;

pub use chat::chat_ws_handler;
