//! Configuration module for the chat relay gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use chat_relay_gateway::config::ServerConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config = ServerConfig::from_file(Path::new("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

mod env;
mod merge;
mod secret;
mod validation;
mod yaml;

pub use secret::ApiKey;

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
/// Default transcription model
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
/// Default speech model
pub const DEFAULT_TTS_MODEL: &str = "tts-1";
/// Default synthesis voice
pub const DEFAULT_TTS_VOICE: &str = "nova";
/// Default provider base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors produced while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS)
/// - Upstream provider credentials and model selection
/// - Chat relay limits and timeouts
/// - Usage log settings
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Upstream provider
    /// OpenAI API key used for chat, transcription and speech
    pub openai_api_key: Option<ApiKey>,
    /// Base URL of the OpenAI-compatible API
    pub openai_base_url: String,

    // Models
    pub chat_model: String,
    pub transcription_model: String,
    pub tts_model: String,
    /// Voice used when a synthesis request does not name one
    pub tts_voice: String,

    // Relay
    /// Inline master prompt. Takes priority over `system_prompt_path`.
    pub system_prompt: Option<String>,
    /// File containing the master prompt
    pub system_prompt_path: Option<PathBuf>,
    /// Maximum silence between upstream fragments before a turn fails
    pub upstream_idle_timeout_seconds: u64,
    pub upstream_connect_timeout_seconds: u64,
    /// Close the socket after this long without client activity while idle
    pub ws_idle_timeout_seconds: u64,
    pub max_message_bytes: usize,
    pub max_instructions_bytes: usize,

    // Speech
    pub max_audio_bytes: usize,

    // Usage log
    /// Optional JSON-lines file that receives every usage record
    pub usage_log_path: Option<PathBuf>,
    /// Records kept in memory, oldest dropped first
    pub usage_log_capacity: usize,
    /// Expose `GET /billing-debug`
    pub usage_debug_enabled: bool,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            tls: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
            system_prompt: None,
            system_prompt_path: None,
            upstream_idle_timeout_seconds: 60,
            upstream_connect_timeout_seconds: 10,
            ws_idle_timeout_seconds: 300,
            max_message_bytes: 50 * 1024,
            max_instructions_bytes: 100 * 1024,
            max_audio_bytes: 25 * 1024 * 1024,
            usage_log_path: None,
            usage_log_capacity: 10_000,
            usage_debug_enabled: false,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables over defaults.
    ///
    /// The `.env` file is loaded in `main.rs` before this is called, so its values
    /// are visible here as environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = merge::merge_config(env::EnvConfig::load()?, None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(env::EnvConfig::load()?, Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn upstream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_idle_timeout_seconds)
    }

    pub fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_connect_timeout_seconds)
    }

    pub fn ws_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_idle_timeout_seconds)
    }
}
