//! OpenAI speech synthesis.
//!
//! - Endpoint: `POST {base_url}/audio/speech`
//! - Voices: alloy, ash, ballad, coral, echo, fable, onyx, nova, sage, shimmer, verse
//! - Output: mp3, opus, aac, flac, wav, pcm (24kHz)

mod config;
mod provider;

pub use config::{AudioOutputFormat, DEFAULT_TTS_MODEL, OpenAISpeechConfig, OpenAIVoice};
pub use provider::OpenAISpeech;
