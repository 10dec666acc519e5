//! Base types for one-shot speech synthesis.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::openai::{AudioOutputFormat, OpenAIVoice};

/// Longest input the speech endpoint accepts, in characters
pub const MAX_TTS_INPUT_CHARS: usize = 4096;

#[derive(Debug, Error)]
pub enum TTSError {
    /// Empty text, unknown voice or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error (status {status:?}): {message}")]
    ProviderError {
        status: Option<u16>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl TTSError {
    /// Message that is safe to return to a client.
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::AuthenticationFailed(_) => "OpenAI API key not configured".to_string(),
            Self::NetworkError(_) => "Could not reach the speech provider".to_string(),
            Self::ProviderError { .. } => "Speech synthesis failed".to_string(),
            Self::ConfigurationError(_) => "Speech synthesis is misconfigured".to_string(),
        }
    }
}

impl From<reqwest::Error> for TTSError {
    fn from(e: reqwest::Error) -> Self {
        Self::NetworkError(e.to_string())
    }
}

pub type TTSResult<T> = Result<T, TTSError>;

/// A validated synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: OpenAIVoice,
    pub format: AudioOutputFormat,
}

impl SpeechRequest {
    /// Validate raw request fields. `voice` falls back to `default_voice`,
    /// `format` to mp3.
    pub fn parse(
        text: &str,
        voice: Option<&str>,
        format: Option<&str>,
        default_voice: OpenAIVoice,
    ) -> TTSResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TTSError::InvalidRequest("Text must not be empty".to_string()));
        }
        if text.chars().count() > MAX_TTS_INPUT_CHARS {
            return Err(TTSError::InvalidRequest(format!(
                "Text exceeds {MAX_TTS_INPUT_CHARS} characters"
            )));
        }

        let voice = match voice.filter(|v| !v.trim().is_empty()) {
            Some(v) => v.parse()?,
            None => default_voice,
        };
        let format = match format.filter(|f| !f.trim().is_empty()) {
            Some(f) => f.parse()?,
            None => AudioOutputFormat::default(),
        };

        Ok(Self {
            text: text.to_string(),
            voice,
            format,
        })
    }
}

/// Synthesized audio with its format.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Bytes,
    pub format: AudioOutputFormat,
}

impl SynthesizedAudio {
    /// `inline; filename=response.<ext>`
    pub fn content_disposition(&self) -> String {
        format!("inline; filename=response.{}", self.format.as_str())
    }
}

/// Stateless request/response speech synthesis.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: SpeechRequest) -> TTSResult<SynthesizedAudio>;

    /// Voice used when a request does not name one.
    fn default_voice(&self) -> OpenAIVoice;
}
