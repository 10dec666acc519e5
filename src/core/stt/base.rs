//! Base types for one-shot audio transcription.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// File name used when the client does not send one
pub const DEFAULT_AUDIO_FILE_NAME: &str = "audio.webm";

/// Errors produced while transcribing audio.
#[derive(Debug, Error)]
pub enum STTError {
    /// Missing, empty or unreadable audio
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Audio payload of {size} bytes exceeds the {limit} byte limit")]
    AudioTooLarge { size: usize, limit: usize },

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

impl STTError {
    /// Message that is safe to return to a client.
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidAudio(msg) => msg.clone(),
            Self::AudioTooLarge { limit, .. } => {
                format!("Audio payload exceeds the {limit} byte limit")
            }
            Self::AuthenticationFailed(_) => "OpenAI API key not configured".to_string(),
            Self::NetworkError(_) => "Could not reach the transcription provider".to_string(),
            Self::ProviderError { .. } => "Transcription failed".to_string(),
            Self::ConfigurationError(_) => "Transcription is misconfigured".to_string(),
        }
    }
}

impl From<reqwest::Error> for STTError {
    fn from(e: reqwest::Error) -> Self {
        Self::NetworkError(e.to_string())
    }
}

pub type STTResult<T> = Result<T, STTError>;

/// One uploaded audio file.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub data: Bytes,
    pub file_name: String,
    /// MIME type reported by the client, if any
    pub content_type: Option<String>,
}

impl AudioUpload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            file_name: DEFAULT_AUDIO_FILE_NAME.to_string(),
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, file_name: Option<&str>) -> Self {
        if let Some(name) = file_name.map(str::trim).filter(|n| !n.is_empty()) {
            self.file_name = name.to_string();
        }
        self
    }

    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.content_type = content_type.map(str::to_string);
        self
    }
}

/// Stateless request/response transcription.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio` to text.
    async fn transcribe(&self, audio: AudioUpload) -> STTResult<String>;

    /// Model identifier for logs.
    fn model(&self) -> &str;
}
