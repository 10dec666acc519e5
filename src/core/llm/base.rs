//! Base traits and types for streaming chat-completion providers.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to an upstream model provider.
#[derive(Debug, Error)]
pub enum LLMError {
    /// No API key configured, or the provider rejected it
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Transport-level failure (DNS, connect refused, reset)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider answered with a non-success status or an error payload
    #[error("Provider error (status {status:?}): {message}")]
    ProviderError {
        status: Option<u16>,
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Connect or inactivity timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The provider stream contained data we could not decode
    #[error("Invalid stream data: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl LLMError {
    /// Message that is safe to show to a client.
    ///
    /// Never includes provider response bodies, credentials or transport details.
    pub fn client_message(&self) -> String {
        match self {
            Self::AuthenticationFailed(_) => "OpenAI API key not configured or rejected".to_string(),
            Self::NetworkError(_) => "Could not reach the model provider".to_string(),
            Self::ProviderError {
                status: Some(status),
                ..
            } => format!("The model provider returned an error (status {status})"),
            Self::ProviderError { status: None, .. } => {
                "The model provider returned an error".to_string()
            }
            Self::RateLimitExceeded(_) => {
                "The model provider is rate limiting requests, please try again shortly".to_string()
            }
            Self::Timeout(_) => "The model provider timed out".to_string(),
            Self::InvalidResponse(_) => "The model provider sent an unreadable response".to_string(),
            Self::InvalidConfiguration(_) => "The model provider is misconfigured".to_string(),
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::AuthenticationFailed(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ProviderError {
                status: Some(status),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), e.to_string())
        } else {
            Self::NetworkError(e.to_string())
        }
    }
}

/// Result type for upstream model operations.
pub type LLMResult<T> = Result<T, LLMError>;

// =============================================================================
// Message Types
// =============================================================================

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One role-tagged message of the prompt context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Incremental text fragments from the provider. `None` is end-of-stream.
pub type ChatStream = BoxStream<'static, LLMResult<String>>;

/// A hosted model that streams a response for an ordered message list.
///
/// Implementations must issue the upstream request lazily, on first poll of
/// the returned stream, so that dropping the stream abandons the call.
pub trait ChatCompletionProvider: Send + Sync {
    /// Start a streaming completion for `messages`.
    fn stream_chat(&self, messages: Vec<ChatMessage>) -> ChatStream;

    /// Model identifier used for usage records and logs.
    fn model(&self) -> &str;

    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}
