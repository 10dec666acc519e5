//! Environment variable layer.
//!
//! Every value is optional here; defaults are applied in [`super::merge`].
//! Empty variables are treated as unset.

use std::str::FromStr;

use super::ConfigError;

/// Values read from the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls_enabled: Option<bool>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,

    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,

    pub chat_model: Option<String>,
    pub transcription_model: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,

    pub system_prompt: Option<String>,
    pub system_prompt_path: Option<String>,
    pub upstream_idle_timeout_seconds: Option<u64>,
    pub upstream_connect_timeout_seconds: Option<u64>,
    pub ws_idle_timeout_seconds: Option<u64>,
    pub max_message_bytes: Option<usize>,
    pub max_instructions_bytes: Option<usize>,
    pub max_audio_bytes: Option<usize>,

    pub usage_log_path: Option<String>,
    pub usage_log_capacity: Option<usize>,
    pub usage_debug_enabled: Option<bool>,

    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl EnvConfig {
    /// Read from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        Ok(Self {
            host: vars.string("HOST"),
            port: vars.parse("PORT")?,
            tls_enabled: vars.bool("TLS_ENABLED")?,
            tls_cert_path: vars.string("TLS_CERT_PATH"),
            tls_key_path: vars.string("TLS_KEY_PATH"),

            openai_api_key: vars.string("OPENAI_API_KEY"),
            openai_base_url: vars.string("OPENAI_BASE_URL"),

            chat_model: vars.string("CHAT_MODEL"),
            transcription_model: vars.string("TRANSCRIPTION_MODEL"),
            tts_model: vars.string("TTS_MODEL"),
            tts_voice: vars.string("TTS_VOICE"),

            system_prompt: vars.string("SYSTEM_PROMPT"),
            system_prompt_path: vars.string("SYSTEM_PROMPT_PATH"),
            upstream_idle_timeout_seconds: vars.parse("UPSTREAM_IDLE_TIMEOUT_SECONDS")?,
            upstream_connect_timeout_seconds: vars.parse("UPSTREAM_CONNECT_TIMEOUT_SECONDS")?,
            ws_idle_timeout_seconds: vars.parse("WS_IDLE_TIMEOUT_SECONDS")?,
            max_message_bytes: vars.parse("MAX_MESSAGE_BYTES")?,
            max_instructions_bytes: vars.parse("MAX_INSTRUCTIONS_BYTES")?,
            max_audio_bytes: vars.parse("MAX_AUDIO_BYTES")?,

            usage_log_path: vars.string("USAGE_LOG_PATH"),
            usage_log_capacity: vars.parse("USAGE_LOG_CAPACITY")?,
            usage_debug_enabled: vars.bool("USAGE_DEBUG_ENABLED")?,

            cors_allowed_origins: vars.string("CORS_ALLOWED_ORIGINS"),
            rate_limit_requests_per_second: vars.parse("RATE_LIMIT_REQUESTS_PER_SECOND")?,
            rate_limit_burst_size: vars.parse("RATE_LIMIT_BURST_SIZE")?,
            max_websocket_connections: vars.parse("MAX_WEBSOCKET_CONNECTIONS")?,
            max_connections_per_ip: vars.parse("MAX_CONNECTIONS_PER_IP")?,
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        match self.string(name) {
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    name: name.to_string(),
                    value: raw,
                }),
            None => Ok(None),
        }
    }

    fn bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        match self.string(name) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    value: raw,
                }),
            },
            None => Ok(None),
        }
    }
}
