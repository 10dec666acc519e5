//! Shared helpers for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use chat_relay_gateway::config::ApiKey;
use chat_relay_gateway::{ServerConfig, routes, state::AppState};
use tokio::net::TcpListener;

/// Configuration pointing every upstream call at `mock_uri`.
pub fn mock_config(mock_uri: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        openai_api_key: Some(ApiKey::new("sk-test")),
        openai_base_url: format!("{mock_uri}/v1"),
        system_prompt: Some("You are a test assistant.".to_string()),
        upstream_idle_timeout_seconds: 5,
        upstream_connect_timeout_seconds: 2,
        usage_debug_enabled: true,
        ..Default::default()
    }
}

/// Start the full application on an ephemeral port.
pub async fn spawn_server(config: ServerConfig) -> (SocketAddr, Arc<AppState>) {
    let state = AppState::new(config)
        .await
        .expect("Failed to build app state");
    let app = routes::create_app_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (addr, state)
}

/// Chat Completions SSE body emitting `fragments` then `[DONE]`.
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    body.push_str(
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    );
    for fragment in fragments {
        let chunk = serde_json::json!({
            "id": "c1",
            "choices": [{"index": 0, "delta": {"content": fragment}}]
        });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
