//! Configuration types for OpenAI speech synthesis.
//!
//! - Voice selection (11 available voices)
//! - Audio output format

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ApiKey;
use crate::core::tts::base::TTSError;

/// Default speech model
pub const DEFAULT_TTS_MODEL: &str = "tts-1";

// =============================================================================
// OpenAI TTS Voices
// =============================================================================

/// Available voices for OpenAI TTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIVoice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Fable,
    Onyx,
    #[default]
    Nova,
    Sage,
    Shimmer,
    Verse,
}

impl OpenAIVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Get all available voices.
    pub fn all() -> &'static [OpenAIVoice] {
        &[
            Self::Alloy,
            Self::Ash,
            Self::Ballad,
            Self::Coral,
            Self::Echo,
            Self::Fable,
            Self::Onyx,
            Self::Nova,
            Self::Sage,
            Self::Shimmer,
            Self::Verse,
        ]
    }
}

impl FromStr for OpenAIVoice {
    type Err = TTSError;

    /// Case-insensitive. Unknown names are rejected rather than defaulted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|voice| voice.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::all().iter().map(|v| v.as_str()).collect();
                TTSError::InvalidRequest(format!(
                    "Unknown voice '{}'. Supported voices: {}",
                    s.trim(),
                    known.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for OpenAIVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Output Format
// =============================================================================

/// Supported audio output formats for OpenAI TTS.
///
/// The default response format is mp3. PCM output is 24kHz mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioOutputFormat {
    #[default]
    Mp3,
    Opus,
    Aac,
    Flac,
    Wav,
    /// Raw PCM (24kHz 16-bit mono little-endian)
    Pcm,
}

impl AudioOutputFormat {
    /// API parameter value, also used as the file extension.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }

    /// Get the MIME type for this format.
    #[inline]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/opus",
            Self::Aac => "audio/aac",
            Self::Flac => "audio/flac",
            Self::Wav => "audio/wav",
            Self::Pcm => "audio/pcm",
        }
    }
}

impl FromStr for AudioOutputFormat {
    type Err = TTSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" | "mpeg" => Ok(Self::Mp3),
            "opus" => Ok(Self::Opus),
            "aac" => Ok(Self::Aac),
            "flac" => Ok(Self::Flac),
            "wav" => Ok(Self::Wav),
            "pcm" => Ok(Self::Pcm),
            other => Err(TTSError::InvalidRequest(format!(
                "Unknown audio format '{other}'. Supported formats: mp3, opus, aac, flac, wav, pcm"
            ))),
        }
    }
}

impl std::fmt::Display for AudioOutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Provider configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct OpenAISpeechConfig {
    pub api_key: Option<ApiKey>,
    /// Base URL without trailing slash
    pub base_url: String,
    pub model: String,
    /// Voice used when a request does not name one
    pub default_voice: OpenAIVoice,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for OpenAISpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: crate::core::llm::openai::OPENAI_API_BASE_URL.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            default_voice: OpenAIVoice::default(),
            connect_timeout: crate::core::llm::openai::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAISpeechConfig {
    /// `{base_url}/audio/speech`
    pub fn api_url(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }
}
