pub mod base;
pub mod openai;

pub use base::{
    MAX_TTS_INPUT_CHARS, SpeechRequest, SpeechSynthesizer, SynthesizedAudio, TTSError, TTSResult,
};
pub use openai::{AudioOutputFormat, OpenAISpeech, OpenAISpeechConfig, OpenAIVoice};
