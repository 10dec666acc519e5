pub mod latency;
pub mod llm;
pub mod relay;
pub mod stt;
pub mod tts;
pub mod usage;

// Re-export commonly used types for convenience
pub use latency::{LatencyMeasurement, LatencyTracker};
pub use llm::{ChatCompletionProvider, ChatMessage, ChatRole, LLMError, LLMResult, OpenAIChat};
pub use relay::{ChatSession, ClientFrame, EventSink, RelayContext};
pub use stt::{AudioUpload, OpenAITranscriber, STTError, STTResult, Transcriber};
pub use tts::{
    AudioOutputFormat, OpenAISpeech, OpenAIVoice, SpeechRequest, SpeechSynthesizer,
    SynthesizedAudio, TTSError, TTSResult,
};
pub use usage::{UsageLog, UsageRecord, UsageRecorder};
