//! Process-wide application state.
//!
//! Built once at startup from [`ServerConfig`]. Everything here is read-only
//! afterwards except the usage log (append-only) and the connection counters.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::llm::{ChatCompletionProvider, LLMError, OpenAIChat, OpenAIChatConfig};
use crate::core::relay::{MessageLimits, PromptBuilder, RelayContext};
use crate::core::stt::{OpenAITranscriber, OpenAITranscriberConfig, STTError, Transcriber};
use crate::core::tts::{
    OpenAISpeech, OpenAISpeechConfig, OpenAIVoice, SpeechSynthesizer, TTSError,
};
use crate::core::usage::UsageLog;

/// Startup failures while building [`AppState`].
#[derive(Debug, Error)]
pub enum StateInitError {
    #[error("Failed to load system prompt: {0}")]
    SystemPrompt(#[from] std::io::Error),

    #[error("Failed to create chat client: {0}")]
    Chat(#[from] LLMError),

    #[error("Failed to create transcription client: {0}")]
    Transcription(#[from] STTError),

    #[error("Failed to create speech client: {0}")]
    Speech(#[from] TTSError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    GlobalLimitReached,
    PerIpLimitReached,
}

pub struct AppState {
    pub config: ServerConfig,
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub usage: Arc<UsageLog>,
    pub relay: RelayContext,

    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, u32>,
}

impl AppState {
    /// Build the state and the shared upstream clients.
    ///
    /// Must be called from within a tokio runtime when a usage log file is configured.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, StateInitError> {
        let prompt = PromptBuilder::from_sources(
            config.system_prompt.as_deref(),
            config.system_prompt_path.as_deref(),
        )?;

        let chat = OpenAIChat::new(OpenAIChatConfig {
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.chat_model.clone(),
            connect_timeout: config.upstream_connect_timeout(),
        })?;

        let transcriber = OpenAITranscriber::new(OpenAITranscriberConfig {
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.transcription_model.clone(),
            connect_timeout: config.upstream_connect_timeout(),
            ..Default::default()
        })?;

        let default_voice: OpenAIVoice = config.tts_voice.parse()?;
        let synthesizer = OpenAISpeech::new(OpenAISpeechConfig {
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.tts_model.clone(),
            default_voice,
            connect_timeout: config.upstream_connect_timeout(),
            ..Default::default()
        })?;

        let usage = Arc::new(match &config.usage_log_path {
            Some(path) => UsageLog::with_file(config.usage_log_capacity, path.clone()),
            None => UsageLog::new(config.usage_log_capacity),
        });

        if config.openai_api_key.is_none() {
            info!("OPENAI_API_KEY not set; upstream requests will fail until it is configured");
        }

        let provider: Arc<dyn ChatCompletionProvider> = Arc::new(chat);
        let relay = RelayContext {
            provider,
            prompt: Arc::new(prompt),
            usage: usage.clone(),
            limits: MessageLimits {
                max_text_bytes: config.max_message_bytes,
                max_instructions_bytes: config.max_instructions_bytes,
            },
            upstream_idle_timeout: config.upstream_idle_timeout(),
            client_idle_timeout: config.ws_idle_timeout(),
        };

        Ok(Arc::new(Self {
            config,
            transcriber: Arc::new(transcriber),
            synthesizer: Arc::new(synthesizer),
            usage,
            relay,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        }))
    }

    /// Reserve a WebSocket slot for `ip`.
    ///
    /// Every successful call must be paired with [`AppState::release_connection`].
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        if let Some(max) = self.config.max_websocket_connections {
            self.ws_connections
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    (current < max).then_some(current + 1)
                })
                .map_err(|_| ConnectionLimitError::GlobalLimitReached)?;
        } else {
            self.ws_connections.fetch_add(1, Ordering::AcqRel);
        }

        let mut per_ip = self.ip_connections.entry(ip).or_insert(0);
        if *per_ip >= self.config.max_connections_per_ip {
            drop(per_ip);
            self.ws_connections.fetch_sub(1, Ordering::AcqRel);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *per_ip += 1;

        Ok(())
    }

    pub fn release_connection(&self, ip: IpAddr) {
        // Saturating so a double release cannot wrap the counter
        let _ = self
            .ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            });

        self.ip_connections.remove_if_mut(&ip, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::Acquire)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_state_uses_configured_models() {
        let config = ServerConfig {
            chat_model: "gpt-test".to_string(),
            max_message_bytes: 10,
            ..Default::default()
        };
        let state = AppState::new(config).await.unwrap();

        assert_eq!(state.relay.provider.model(), "gpt-test");
        assert_eq!(state.relay.limits.max_text_bytes, 10);
        assert_eq!(state.transcriber.model(), "whisper-1");
        assert_eq!(state.synthesizer.default_voice(), OpenAIVoice::Nova);
        assert!(state.usage.is_empty());
    }

    #[tokio::test]
    async fn test_missing_prompt_file_fails_startup() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            system_prompt_path: Some(temp_dir.path().join("missing.txt")),
            ..Default::default()
        };
        assert!(matches!(
            AppState::new(config).await,
            Err(StateInitError::SystemPrompt(_))
        ));
    }

    #[tokio::test]
    async fn test_per_ip_limit() {
        let config = ServerConfig {
            max_websocket_connections: Some(10),
            max_connections_per_ip: 3,
            ..Default::default()
        };
        let state = AppState::new(config).await.unwrap();
        let ip: IpAddr = Ipv4Addr::new(192, 168, 1, 100).into();

        assert_eq!(state.ws_connection_count(), 0);
        for expected in 1..=3 {
            assert!(state.try_acquire_connection(ip).is_ok());
            assert_eq!(state.ip_connection_count(&ip), expected);
        }

        assert_eq!(
            state.try_acquire_connection(ip),
            Err(ConnectionLimitError::PerIpLimitReached)
        );
        // Rejection does not leak a global slot
        assert_eq!(state.ws_connection_count(), 3);

        state.release_connection(ip);
        assert_eq!(state.ws_connection_count(), 2);
        assert!(state.try_acquire_connection(ip).is_ok());
    }

    #[tokio::test]
    async fn test_global_limit() {
        let config = ServerConfig {
            max_websocket_connections: Some(5),
            max_connections_per_ip: 10,
            ..Default::default()
        };
        let state = AppState::new(config).await.unwrap();
        let ips: Vec<IpAddr> = (1..=6)
            .map(|i| Ipv4Addr::new(10, 0, 0, i).into())
            .collect();

        for ip in &ips[0..5] {
            assert!(state.try_acquire_connection(*ip).is_ok());
        }
        assert_eq!(
            state.try_acquire_connection(ips[5]),
            Err(ConnectionLimitError::GlobalLimitReached)
        );

        state.release_connection(ips[0]);
        assert_eq!(state.ip_connection_count(&ips[0]), 0);
        assert!(state.try_acquire_connection(ips[5]).is_ok());
    }

    #[tokio::test]
    async fn test_release_without_acquire_is_harmless() {
        let state = AppState::new(ServerConfig::default()).await.unwrap();
        let ip: IpAddr = Ipv4Addr::LOCALHOST.into();
        state.release_connection(ip);
        assert_eq!(state.ws_connection_count(), 0);
        assert_eq!(state.ip_connection_count(&ip), 0);
    }
}
