//! Server Startup Tests
//!
//! Configuration loading and the public HTTP surface, exercised in-process
//! with `oneshot`.

use std::fs;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use serial_test::serial;
use tempfile::TempDir;
use tower::util::ServiceExt;

use chat_relay_gateway::{ServerConfig, routes, state::AppState};

async fn get(config: ServerConfig, uri: &str) -> (StatusCode, Vec<u8>) {
    let state = AppState::new(config).await.unwrap();
    let app = routes::create_app_router(state);

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health_without_api_key() {
    let (status, body) = get(ServerConfig::default(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_index_serves_chat_page() {
    let (status, body) = get(ServerConfig::default(), "/").await;
    assert_eq!(status, StatusCode::OK);
    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("<html"));
    assert!(page.contains("/api/tts"));
}

#[tokio::test]
async fn test_billing_debug_disabled_by_default() {
    let (status, body) = get(ServerConfig::default(), "/billing-debug").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_billing_debug_when_enabled() {
    let config = ServerConfig {
        usage_debug_enabled: true,
        ..Default::default()
    };
    let (status, body) = get(config, "/billing-debug").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["total_sessions"], 0);
    assert!(body["records"].as_array().unwrap().is_empty());
    assert!(body["note"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, _) = get(ServerConfig::default(), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_state_from_yaml_file() {
    let temp_dir = TempDir::new().unwrap();
    let prompt_path = temp_dir.path().join("prompt.txt");
    fs::write(&prompt_path, "Prompt from file.").unwrap();

    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        format!(
            r#"
server:
  host: "127.0.0.1"
  port: 5055
models:
  chat: "gpt-4o"
relay:
  system_prompt_path: "{}"
usage:
  log_path: "{}"
  debug_enabled: true
"#,
            prompt_path.display(),
            temp_dir.path().join("usage.jsonl").display()
        ),
    )
    .unwrap();

    let config = ServerConfig::from_file(&config_path).unwrap();
    assert_eq!(config.address(), "127.0.0.1:5055");

    let state = AppState::new(config).await.unwrap();
    assert_eq!(state.relay.provider.model(), "gpt-4o");
    assert_eq!(state.relay.prompt.master_prompt(), "Prompt from file.");
    assert!(state.config.usage_debug_enabled);
}

#[tokio::test]
#[serial]
async fn test_invalid_yaml_voice_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "models:\n  tts_voice: \"robot\"\n").unwrap();

    assert!(ServerConfig::from_file(&config_path).is_err());
}
