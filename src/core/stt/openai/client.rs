use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use super::config::OpenAITranscriberConfig;
use crate::core::llm::openai::messages::OpenAIErrorResponse;
use crate::core::stt::base::{AudioUpload, STTError, STTResult, Transcriber};

/// OpenAI transcription client.
///
/// The HTTP client is reused across requests for connection pooling.
#[derive(Debug, Clone)]
pub struct OpenAITranscriber {
    config: OpenAITranscriberConfig,
    http_client: Client,
}

impl OpenAITranscriber {
    pub fn new(config: OpenAITranscriberConfig) -> STTResult<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                STTError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn build_form(&self, audio: AudioUpload) -> STTResult<Form> {
        let mut file_part = Part::stream(audio.data).file_name(audio.file_name);
        if let Some(content_type) = audio.content_type.as_deref() {
            file_part = file_part
                .mime_str(content_type)
                .map_err(|_| STTError::InvalidAudio("Invalid audio content type".to_string()))?;
        }

        Ok(Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("response_format", "text"))
    }
}

#[async_trait]
impl Transcriber for OpenAITranscriber {
    async fn transcribe(&self, audio: AudioUpload) -> STTResult<String> {
        if audio.data.is_empty() {
            return Err(STTError::InvalidAudio("Audio file is empty".to_string()));
        }

        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            STTError::AuthenticationFailed("OpenAI API key not configured".to_string())
        })?;

        let audio_bytes = audio.data.len();
        let form = self.build_form(audio)?;

        debug!(
            model = %self.config.model,
            audio_bytes,
            "Sending transcription request"
        );

        let response = self
            .http_client
            .post(self.config.api_url())
            .bearer_auth(api_key.expose())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| STTError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAIErrorResponse>(&response_text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("OpenAI API error ({status})"));

            warn!(status = status.as_u16(), "Transcription request rejected");

            return Err(match status.as_u16() {
                401 | 403 => STTError::AuthenticationFailed(message),
                code => STTError::ProviderError {
                    status: Some(code),
                    message,
                },
            });
        }

        Ok(response_text.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_audio_rejected() {
        let transcriber = OpenAITranscriber::new(OpenAITranscriberConfig::default()).unwrap();
        let result = transcriber.transcribe(AudioUpload::new(Vec::new())).await;
        assert!(matches!(result, Err(STTError::InvalidAudio(_))));
    }

    #[tokio::test]
    async fn test_missing_key_is_authentication_error() {
        let transcriber = OpenAITranscriber::new(OpenAITranscriberConfig::default()).unwrap();
        let result = transcriber.transcribe(AudioUpload::new(vec![0u8; 16])).await;
        assert!(matches!(result, Err(STTError::AuthenticationFailed(_))));
    }

    #[test]
    fn test_api_url() {
        let config = OpenAITranscriberConfig {
            base_url: "http://localhost:1234/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.api_url(),
            "http://localhost:1234/v1/audio/transcriptions"
        );
        assert_eq!(config.model, "whisper-1");
    }

    #[test]
    fn test_invalid_content_type_rejected() {
        let transcriber = OpenAITranscriber::new(OpenAITranscriberConfig::default()).unwrap();
        let upload = AudioUpload::new(vec![0u8; 4]).with_content_type(Some("not a mime"));
        assert!(matches!(
            transcriber.build_form(upload),
            Err(STTError::InvalidAudio(_))
        ));
    }
}
