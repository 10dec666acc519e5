pub mod base;
pub mod openai;

pub use base::{AudioUpload, DEFAULT_AUDIO_FILE_NAME, STTError, STTResult, Transcriber};
pub use openai::{OpenAITranscriber, OpenAITranscriberConfig};
