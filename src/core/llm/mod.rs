pub mod base;
pub mod openai;

pub use base::{
    ChatCompletionProvider, ChatMessage, ChatRole, ChatStream, LLMError, LLMResult,
};
pub use openai::{OpenAIChat, OpenAIChatConfig};
