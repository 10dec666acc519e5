//! OpenAI speech provider.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::config::{OpenAISpeechConfig, OpenAIVoice};
use crate::core::llm::openai::messages::OpenAIErrorResponse;
use crate::core::tts::base::{
    SpeechRequest, SpeechSynthesizer, SynthesizedAudio, TTSError, TTSResult,
};

/// OpenAI TTS provider using the Audio Speech API.
#[derive(Debug, Clone)]
pub struct OpenAISpeech {
    config: OpenAISpeechConfig,
    http_client: Client,
}

impl OpenAISpeech {
    pub fn new(config: OpenAISpeechConfig) -> TTSResult<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                TTSError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Build the OpenAI-specific HTTP request body
    fn request_body(&self, request: &SpeechRequest) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "input": request.text,
            "voice": request.voice.as_str(),
            "response_format": request.format.as_str(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeech {
    async fn synthesize(&self, request: SpeechRequest) -> TTSResult<SynthesizedAudio> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            TTSError::AuthenticationFailed("OpenAI API key not configured".to_string())
        })?;

        debug!(
            model = %self.config.model,
            voice = %request.voice,
            format = %request.format,
            chars = request.text.chars().count(),
            "Sending speech request"
        );

        let response = self
            .http_client
            .post(self.config.api_url())
            .bearer_auth(api_key.expose())
            .json(&self.request_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("OpenAI API error ({status})"));

            warn!(status = status.as_u16(), "Speech request rejected");

            return Err(match status.as_u16() {
                401 | 403 => TTSError::AuthenticationFailed(message),
                code => TTSError::ProviderError {
                    status: Some(code),
                    message,
                },
            });
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read audio: {e}")))?;

        Ok(SynthesizedAudio {
            data,
            format: request.format,
        })
    }

    fn default_voice(&self) -> OpenAIVoice {
        self.config.default_voice
    }
}
