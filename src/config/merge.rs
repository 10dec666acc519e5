//! Merge YAML and environment layers over defaults.

use std::path::PathBuf;

use super::env::EnvConfig;
use super::yaml::YamlConfig;
use super::{ApiKey, ConfigError, ServerConfig, TlsConfig};

/// Build a [`ServerConfig`] with priority YAML > ENV > defaults.
pub fn merge_config(env: EnvConfig, yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let yaml = yaml.unwrap_or_default();
    let defaults = ServerConfig::default();

    let server = yaml.server.unwrap_or_default();
    let tls = server.tls.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let models = yaml.models.unwrap_or_default();
    let relay = yaml.relay.unwrap_or_default();
    let speech = yaml.speech.unwrap_or_default();
    let usage = yaml.usage.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let tls_enabled = tls.enabled.or(env.tls_enabled).unwrap_or(false);
    let tls = resolve_tls(
        tls_enabled,
        tls.cert_path.or(env.tls_cert_path),
        tls.key_path.or(env.tls_key_path),
    )?;

    Ok(ServerConfig {
        host: server.host.or(env.host).unwrap_or(defaults.host),
        port: server.port.or(env.port).unwrap_or(defaults.port),
        tls,

        openai_api_key: providers
            .openai_api_key
            .or(env.openai_api_key)
            .filter(|key| !key.trim().is_empty())
            .map(ApiKey::from),
        openai_base_url: providers
            .openai_base_url
            .or(env.openai_base_url)
            .unwrap_or(defaults.openai_base_url),

        chat_model: models.chat.or(env.chat_model).unwrap_or(defaults.chat_model),
        transcription_model: models
            .transcription
            .or(env.transcription_model)
            .unwrap_or(defaults.transcription_model),
        tts_model: models.tts.or(env.tts_model).unwrap_or(defaults.tts_model),
        tts_voice: models
            .tts_voice
            .or(env.tts_voice)
            .unwrap_or(defaults.tts_voice),

        system_prompt: relay.system_prompt.or(env.system_prompt),
        system_prompt_path: relay
            .system_prompt_path
            .or(env.system_prompt_path)
            .map(PathBuf::from),
        upstream_idle_timeout_seconds: relay
            .upstream_idle_timeout_seconds
            .or(env.upstream_idle_timeout_seconds)
            .unwrap_or(defaults.upstream_idle_timeout_seconds),
        upstream_connect_timeout_seconds: relay
            .upstream_connect_timeout_seconds
            .or(env.upstream_connect_timeout_seconds)
            .unwrap_or(defaults.upstream_connect_timeout_seconds),
        ws_idle_timeout_seconds: relay
            .ws_idle_timeout_seconds
            .or(env.ws_idle_timeout_seconds)
            .unwrap_or(defaults.ws_idle_timeout_seconds),
        max_message_bytes: relay
            .max_message_bytes
            .or(env.max_message_bytes)
            .unwrap_or(defaults.max_message_bytes),
        max_instructions_bytes: relay
            .max_instructions_bytes
            .or(env.max_instructions_bytes)
            .unwrap_or(defaults.max_instructions_bytes),
        max_audio_bytes: speech
            .max_audio_bytes
            .or(env.max_audio_bytes)
            .unwrap_or(defaults.max_audio_bytes),

        usage_log_path: usage.log_path.or(env.usage_log_path).map(PathBuf::from),
        usage_log_capacity: usage
            .log_capacity
            .or(env.usage_log_capacity)
            .unwrap_or(defaults.usage_log_capacity),
        usage_debug_enabled: usage
            .debug_enabled
            .or(env.usage_debug_enabled)
            .unwrap_or(defaults.usage_debug_enabled),

        cors_allowed_origins: security.cors_allowed_origins.or(env.cors_allowed_origins),
        rate_limit_requests_per_second: security
            .rate_limit_requests_per_second
            .or(env.rate_limit_requests_per_second)
            .unwrap_or(defaults.rate_limit_requests_per_second),
        rate_limit_burst_size: security
            .rate_limit_burst_size
            .or(env.rate_limit_burst_size)
            .unwrap_or(defaults.rate_limit_burst_size),
        max_websocket_connections: security
            .max_websocket_connections
            .or(env.max_websocket_connections),
        max_connections_per_ip: security
            .max_connections_per_ip
            .or(env.max_connections_per_ip)
            .unwrap_or(defaults.max_connections_per_ip),
    })
}

fn resolve_tls(
    enabled: bool,
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, ConfigError> {
    if !enabled {
        return Ok(None);
    }

    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        _ => Err(ConfigError::Validation(
            "TLS is enabled but TLS_CERT_PATH and TLS_KEY_PATH are not both set".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::yaml::{ProvidersYaml, ServerYaml, TlsYaml};

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = merge_config(EnvConfig::default(), None).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert!(config.tls.is_none());
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.tts_voice, "nova");
        assert_eq!(config.max_message_bytes, 50 * 1024);
        assert!(!config.usage_debug_enabled);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let env = EnvConfig {
            port: Some(9000),
            chat_model: Some("gpt-4o".to_string()),
            ..Default::default()
        };
        let config = merge_config(env, None).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.chat_model, "gpt-4o");
    }

    #[test]
    fn test_yaml_overrides_env() {
        let env = EnvConfig {
            host: Some("0.0.0.0".to_string()),
            port: Some(9000),
            openai_api_key: Some("sk-env".to_string()),
            ..Default::default()
        };
        let yaml = YamlConfig {
            server: Some(ServerYaml {
                host: Some("127.0.0.1".to_string()),
                ..Default::default()
            }),
            providers: Some(ProvidersYaml {
                openai_api_key: Some("sk-yaml".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = merge_config(env, Some(yaml)).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        // not set in YAML, env wins
        assert_eq!(config.port, 9000);
        assert_eq!(config.openai_api_key.unwrap().expose(), "sk-yaml");
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let yaml = YamlConfig {
            providers: Some(ProvidersYaml {
                openai_api_key: Some("   ".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = merge_config(EnvConfig::default(), Some(yaml)).unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let env = EnvConfig {
            tls_enabled: Some(true),
            tls_cert_path: Some("/tmp/cert.pem".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            merge_config(env, None),
            Err(ConfigError::Validation(_))
        ));

        let yaml = YamlConfig {
            server: Some(ServerYaml {
                tls: Some(TlsYaml {
                    enabled: Some(true),
                    cert_path: Some("/tmp/cert.pem".to_string()),
                    key_path: Some("/tmp/key.pem".to_string()),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = merge_config(EnvConfig::default(), Some(yaml)).unwrap();
        let tls = config.tls.unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("/tmp/cert.pem"));
        assert_eq!(tls.key_path, PathBuf::from("/tmp/key.pem"));
    }
}
