//! WebSocket chat relay: message protocol, prompt assembly and the per-connection session.

pub mod messages;
pub mod prompt;
pub mod session;

pub use messages::{
    ChatIncomingMessage, ChatMessageRoute, ChatOutgoingMessage, ErrorCode, MAX_INSTRUCTIONS_SIZE,
    MAX_TEXT_SIZE, MessageLimits, parse_incoming,
};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, PromptBuilder};
pub use session::{
    ChatSession, ClientFrame, ConnectionPhase, DEFAULT_CLIENT_IDLE_TIMEOUT,
    DEFAULT_UPSTREAM_IDLE_TIMEOUT, EventSink, RelayContext, SinkClosed,
};
