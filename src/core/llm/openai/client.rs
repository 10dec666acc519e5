//! OpenAI Chat Completions streaming client.
//!
//! # Architecture
//!
//! [`OpenAIChat::stream_chat`] returns a lazy stream. Nothing is sent until the
//! stream is first polled; the HTTP request then runs inside the stream body and
//! each SSE event is decoded as it completes. Dropping the stream drops the
//! in-flight response, which aborts the request.

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::Client;
use tracing::{debug, warn};

use super::config::OpenAIChatConfig;
use super::messages::{ChatCompletionChunk, ChatCompletionRequest, OpenAIErrorResponse};
use super::sse::{SseEvent, sse_events};
use crate::config::ApiKey;
use crate::core::llm::base::{
    ChatCompletionProvider, ChatMessage, ChatStream, LLMError, LLMResult,
};

/// Longest provider error text kept for logs
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Streaming chat client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIChat {
    config: OpenAIChatConfig,
    /// Reused for connection pooling
    http_client: Client,
}

impl OpenAIChat {
    pub fn new(config: OpenAIChatConfig) -> LLMResult<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(16)
            .build()
            .map_err(|e| {
                LLMError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &OpenAIChatConfig {
        &self.config
    }
}

impl ChatCompletionProvider for OpenAIChat {
    fn stream_chat(&self, messages: Vec<ChatMessage>) -> ChatStream {
        Box::pin(completion_stream(
            self.http_client.clone(),
            self.config.chat_completions_url(),
            self.config.api_key.clone(),
            self.config.model.clone(),
            messages,
        ))
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

fn completion_stream(
    http_client: Client,
    url: String,
    api_key: Option<ApiKey>,
    model: String,
    messages: Vec<ChatMessage>,
) -> impl Stream<Item = LLMResult<String>> + Send + 'static {
    try_stream! {
        let api_key = api_key.ok_or_else(|| {
            LLMError::AuthenticationFailed("OpenAI API key not configured".to_string())
        })?;

        let request = ChatCompletionRequest {
            model: &model,
            messages: &messages,
            stream: true,
        };

        debug!(model = %model, messages = messages.len(), "Sending chat completion request");

        let response = http_client
            .post(&url)
            .bearer_auth(api_key.expose())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message_from_body(&text);
            warn!(status = status.as_u16(), "Chat completion request rejected");
            Err::<(), _>(LLMError::from_status(status.as_u16(), message))?;
            return;
        }

        // A body that closes without [DONE] ends the stream normally
        let mut events = Box::pin(sse_events(response.bytes_stream()));
        while let Some(event) = events.next().await {
            match event? {
                SseEvent::Done => break,
                SseEvent::Data(data) => {
                    if let Some(fragment) = decode_data(&data)? {
                        yield fragment;
                    }
                }
            }
        }
    }
}

/// Decode one `data:` payload into an optional text fragment.
///
/// An `error` object inside the stream is a provider error.
fn decode_data(data: &str) -> LLMResult<Option<String>> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| LLMError::InvalidResponse(format!("Malformed stream event: {e}")))?;

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        return Err(LLMError::ProviderError {
            status: None,
            message,
        });
    }

    let chunk: ChatCompletionChunk = serde_json::from_value(value)
        .map_err(|e| LLMError::InvalidResponse(format!("Unexpected chunk shape: {e}")))?;

    Ok(chunk.content().map(str::to_owned))
}

fn error_message_from_body(body: &str) -> String {
    match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_fragment() {
        let data = r#"{"choices":[{"index":0,"delta":{"content":"I'm "}}]}"#;
        assert_eq!(decode_data(data).unwrap(), Some("I'm ".to_string()));
    }

    #[test]
    fn test_decode_skips_empty_delta() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(decode_data(data).unwrap(), None);
    }

    #[test]
    fn test_decode_in_stream_error() {
        let data = r#"{"error":{"message":"The server had an error","type":"server_error"}}"#;
        match decode_data(data) {
            Err(LLMError::ProviderError { status, message }) => {
                assert!(status.is_none());
                assert_eq!(message, "The server had an error");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(matches!(
            decode_data("{not json"),
            Err(LLMError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_error_message_from_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_message_from_body(body), "Incorrect API key provided");

        let long = "x".repeat(2000);
        assert_eq!(error_message_from_body(&long).len(), MAX_ERROR_BODY_CHARS);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_on_first_poll() {
        let chat = OpenAIChat::new(OpenAIChatConfig::default()).unwrap();
        let mut stream = chat.stream_chat(vec![ChatMessage::user("hi")]);

        match stream.next().await {
            Some(Err(LLMError::AuthenticationFailed(_))) => {}
            other => panic!("unexpected: {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_provider_metadata() {
        let chat = OpenAIChat::new(OpenAIChatConfig::default()).unwrap();
        assert_eq!(chat.model(), "gpt-4o-mini");
        assert_eq!(chat.provider_name(), "openai");
    }
}
