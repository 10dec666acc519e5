//! OpenAI Chat Completions configuration.

use std::time::Duration;

use crate::config::ApiKey;

/// Default API base URL
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default TCP/TLS connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`super::OpenAIChat`].
#[derive(Debug, Clone)]
pub struct OpenAIChatConfig {
    /// API key. A missing key surfaces as an authentication error on first use.
    pub api_key: Option<ApiKey>,
    /// Base URL without trailing slash, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// TCP/TLS connect timeout for the HTTP client
    pub connect_timeout: Duration,
}

impl Default for OpenAIChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENAI_API_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl OpenAIChatConfig {
    /// `{base_url}/chat/completions`
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
