//! OpenAI-compatible streaming chat client.
//!
//! Streams `POST /chat/completions` responses over server-sent events and
//! yields the text of each `delta.content` as it arrives.

mod client;
mod config;
pub mod messages;
pub mod sse;

pub use client::OpenAIChat;
pub use config::{
    DEFAULT_CHAT_MODEL, DEFAULT_CONNECT_TIMEOUT, OPENAI_API_BASE_URL, OpenAIChatConfig,
};
