//! Chat WebSocket message types

use serde::{Deserialize, Serialize};

use crate::core::latency::{LatencyMeasurement, LatencyMillis};

/// Default maximum size for a user message (50 KB)
pub const MAX_TEXT_SIZE: usize = 50 * 1024;

/// Default maximum size for instructions (100 KB)
pub const MAX_INSTRUCTIONS_SIZE: usize = 100 * 1024;

/// Room for the JSON envelope around text and instructions in one frame
const FRAME_ENVELOPE_BYTES: usize = 64 * 1024;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Incoming WebSocket messages from the client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ChatIncomingMessage {
    /// Start a turn
    #[serde(rename = "user_message")]
    UserMessage {
        text: String,
        /// Extra system text for this exchange only
        #[serde(default)]
        instructions: Option<String>,
    },
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Error codes carried by `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Frame was not a valid JSON message
    ParseError,
    /// Message was well-formed but rejected (empty, too large, binary)
    InputError,
    /// A response is still streaming
    TurnInProgress,
    /// The provider failed mid-turn
    UpstreamError,
    /// No fragment arrived within the inactivity timeout
    UpstreamTimeout,
}

/// Outgoing WebSocket messages to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatOutgoingMessage {
    /// Sent once when the connection opens
    #[serde(rename = "session_created")]
    SessionCreated { session_id: String, model: String },

    /// One upstream fragment
    #[serde(rename = "chunk")]
    Chunk { text: String },

    /// Turn completed successfully
    #[serde(rename = "done")]
    Done {
        full_text: String,
        /// `null` when no fragment arrived
        ttft_ms: Option<f64>,
        total_ms: f64,
    },

    /// Turn failed or input was rejected
    #[serde(rename = "error")]
    Error { code: ErrorCode, message: String },
}

impl ChatOutgoingMessage {
    pub fn done(full_text: String, latency: LatencyMeasurement) -> Self {
        let millis = LatencyMillis::from(latency);
        Self::Done {
            full_text,
            ttft_ms: millis.ttft_ms,
            total_ms: millis.total_ms,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// True for `done` and `error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Message routing for the socket writer task
#[derive(Debug)]
pub enum ChatMessageRoute {
    Outgoing(ChatOutgoingMessage),
    Close,
}

// =============================================================================
// Validation
// =============================================================================

/// Size limits applied to user messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLimits {
    pub max_text_bytes: usize,
    pub max_instructions_bytes: usize,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_text_bytes: MAX_TEXT_SIZE,
            max_instructions_bytes: MAX_INSTRUCTIONS_SIZE,
        }
    }
}

impl MessageLimits {
    /// Largest WebSocket frame that can still carry a message within these
    /// limits. JSON escaping may double the payload.
    pub fn max_frame_bytes(&self) -> usize {
        self.max_text_bytes
            .saturating_add(self.max_instructions_bytes)
            .saturating_mul(2)
            .saturating_add(FRAME_ENVELOPE_BYTES)
    }

    /// Returns a client-facing reason when the message must be rejected.
    pub fn validate(&self, text: &str, instructions: Option<&str>) -> Result<(), String> {
        if text.trim().is_empty() {
            return Err("Message text must not be empty".to_string());
        }
        if text.len() > self.max_text_bytes {
            return Err(format!(
                "Message text too large: {} bytes (max: {} bytes)",
                text.len(),
                self.max_text_bytes
            ));
        }
        if let Some(instructions) = instructions
            && instructions.len() > self.max_instructions_bytes
        {
            return Err(format!(
                "Instructions too large: {} bytes (max: {} bytes)",
                instructions.len(),
                self.max_instructions_bytes
            ));
        }
        Ok(())
    }
}

/// Parse a text frame. The error is a client-facing message.
pub fn parse_incoming(frame: &str) -> Result<ChatIncomingMessage, String> {
    serde_json::from_str(frame).map_err(|e| format!("Invalid message format: {e}"))
}
