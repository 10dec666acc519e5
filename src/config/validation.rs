//! Validation of a merged [`ServerConfig`].

use url::Url;

use super::{ConfigError, ServerConfig};
use crate::core::tts::OpenAIVoice;

/// Validate the merged configuration.
///
/// # Errors
/// Returns [`ConfigError::Validation`] describing the first problem found.
pub fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(invalid("PORT must be non-zero"));
    }

    validate_base_url(&config.openai_base_url)?;

    for (name, value) in [
        ("CHAT_MODEL", &config.chat_model),
        ("TRANSCRIPTION_MODEL", &config.transcription_model),
        ("TTS_MODEL", &config.tts_model),
    ] {
        if value.trim().is_empty() {
            return Err(invalid(format!("{name} must not be empty")));
        }
    }

    if config.tts_voice.parse::<OpenAIVoice>().is_err() {
        return Err(invalid(format!(
            "TTS_VOICE '{}' is not a supported voice",
            config.tts_voice
        )));
    }

    for (name, value) in [
        (
            "UPSTREAM_IDLE_TIMEOUT_SECONDS",
            config.upstream_idle_timeout_seconds,
        ),
        (
            "UPSTREAM_CONNECT_TIMEOUT_SECONDS",
            config.upstream_connect_timeout_seconds,
        ),
        ("WS_IDLE_TIMEOUT_SECONDS", config.ws_idle_timeout_seconds),
    ] {
        if value == 0 {
            return Err(invalid(format!("{name} must be greater than zero")));
        }
    }

    for (name, value) in [
        ("MAX_MESSAGE_BYTES", config.max_message_bytes),
        ("MAX_INSTRUCTIONS_BYTES", config.max_instructions_bytes),
        ("MAX_AUDIO_BYTES", config.max_audio_bytes),
        ("USAGE_LOG_CAPACITY", config.usage_log_capacity),
    ] {
        if value == 0 {
            return Err(invalid(format!("{name} must be greater than zero")));
        }
    }

    if config.rate_limit_requests_per_second == 0 {
        return Err(invalid("RATE_LIMIT_REQUESTS_PER_SECOND must be greater than zero"));
    }
    if config.rate_limit_burst_size == 0 {
        return Err(invalid("RATE_LIMIT_BURST_SIZE must be at least 1"));
    }
    if config.max_connections_per_ip == 0 {
        return Err(invalid("MAX_CONNECTIONS_PER_IP must be greater than zero"));
    }
    if config.max_websocket_connections == Some(0) {
        return Err(invalid(
            "MAX_WEBSOCKET_CONNECTIONS must be greater than zero when set",
        ));
    }

    Ok(())
}

/// The provider base URL must be an absolute http(s) URL.
pub fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| invalid(format!("OPENAI_BASE_URL '{raw}' is not a valid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(invalid(format!(
                "OPENAI_BASE_URL must use http or https, got '{scheme}'"
            )));
        }
    }

    if url.host_str().is_none() {
        return Err(invalid("OPENAI_BASE_URL must include a host"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}
