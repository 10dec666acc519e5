//! OpenAI audio transcription configuration.

use std::time::Duration;

use crate::config::ApiKey;

/// Default transcription model
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Whisper can take a while on long clips
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OpenAITranscriberConfig {
    pub api_key: Option<ApiKey>,
    /// Base URL without trailing slash
    pub base_url: String,
    pub model: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for OpenAITranscriberConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: crate::core::llm::openai::OPENAI_API_BASE_URL.to_string(),
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            connect_timeout: crate::core::llm::openai::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OpenAITranscriberConfig {
    /// `{base_url}/audio/transcriptions`
    pub fn api_url(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'))
    }
}
