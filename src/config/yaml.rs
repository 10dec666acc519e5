use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in the
/// file take priority over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5000
///   tls:
///     enabled: false
///     cert_path: "/etc/ssl/cert.pem"
///     key_path: "/etc/ssl/key.pem"
///
/// providers:
///   openai_api_key: "sk-..."
///   openai_base_url: "https://api.openai.com/v1"
///
/// models:
///   chat: "gpt-4o-mini"
///   transcription: "whisper-1"
///   tts: "tts-1"
///   tts_voice: "nova"
///
/// relay:
///   system_prompt_path: "/etc/chat-relay/prompt.txt"
///   upstream_idle_timeout_seconds: 60
///   upstream_connect_timeout_seconds: 10
///   ws_idle_timeout_seconds: 300
///   max_message_bytes: 51200
///   max_instructions_bytes: 102400
///
/// speech:
///   max_audio_bytes: 26214400
///
/// usage:
///   log_path: "/var/log/chat-relay/usage.jsonl"
///   log_capacity: 10000
///   debug_enabled: false
///
/// security:
///   cors_allowed_origins: "https://chat.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///   max_websocket_connections: 1000
///   max_connections_per_ip: 100
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub models: Option<ModelsYaml>,
    pub relay: Option<RelayYaml>,
    pub speech: Option<SpeechYaml>,
    pub usage: Option<UsageYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Upstream provider credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

/// Model selection from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelsYaml {
    pub chat: Option<String>,
    pub transcription: Option<String>,
    pub tts: Option<String>,
    pub tts_voice: Option<String>,
}

/// Chat relay settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayYaml {
    pub system_prompt: Option<String>,
    pub system_prompt_path: Option<String>,
    pub upstream_idle_timeout_seconds: Option<u64>,
    pub upstream_connect_timeout_seconds: Option<u64>,
    pub ws_idle_timeout_seconds: Option<u64>,
    pub max_message_bytes: Option<usize>,
    pub max_instructions_bytes: Option<usize>,
}

/// Speech endpoint settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SpeechYaml {
    pub max_audio_bytes: Option<usize>,
}

/// Usage log settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UsageYaml {
    pub log_path: Option<String>,
    pub log_capacity: Option<usize>,
    pub debug_enabled: Option<bool>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        serde_yaml::from_str(&contents).map_err(ConfigError::ParseYaml)
    }
}
