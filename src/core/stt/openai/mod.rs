//! OpenAI audio transcription (Whisper).
//!
//! - Endpoint: `POST {base_url}/audio/transcriptions`
//! - Multipart fields: `file`, `model`, `response_format=text`

mod client;
mod config;

pub use client::OpenAITranscriber;
pub use config::{DEFAULT_TRANSCRIPTION_MODEL, OpenAITranscriberConfig};
