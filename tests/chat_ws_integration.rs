//! End-to-end tests for the chat WebSocket relay against a mocked upstream.

mod common;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{mock_config, sse_body, spawn_server};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn mount_sse(server: &MockServer, fragments: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(fragments)),
        )
        .mount(server)
        .await;
}

async fn next_event(ws: &mut WsStream) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for event")
            .expect("Socket closed")
            .expect("Socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("Event is not JSON");
        }
    }
}

/// Read events until `done` or `error`.
async fn collect_turn(ws: &mut WsStream) -> Vec<Value> {
    let mut events = Vec::new();
    loop {
        let event = next_event(ws).await;
        let terminal = matches!(event["type"].as_str(), Some("done") | Some("error"));
        events.push(event);
        if terminal {
            return events;
        }
    }
}

async fn send_user_message(ws: &mut WsStream, payload: Value) {
    ws.send(Message::Text(payload.to_string().into()))
        .await
        .expect("Failed to send");
}

#[tokio::test]
async fn test_chat_turn_streams_chunks_and_records_usage() {
    let upstream = MockServer::start().await;
    mount_sse(&upstream, &["I'm ", "here ", "for you."]).await;

    let (addr, state) = spawn_server(mock_config(&upstream.uri())).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/chat"))
        .await
        .expect("Failed to connect");

    let created = next_event(&mut ws).await;
    assert_eq!(created["type"], "session_created");
    assert_eq!(created["model"], "gpt-4o-mini");
    let session_id = created["session_id"].as_str().unwrap().to_string();

    send_user_message(
        &mut ws,
        json!({"type": "user_message", "text": "Hello", "instructions": "Be brief."}),
    )
    .await;
    let events = collect_turn(&mut ws).await;

    let chunks: Vec<&str> = events
        .iter()
        .filter(|e| e["type"] == "chunk")
        .map(|e| e["text"].as_str().unwrap())
        .collect();
    assert_eq!(chunks, vec!["I'm ", "here ", "for you."]);

    let done = events.last().unwrap();
    assert_eq!(done["type"], "done");
    assert_eq!(done["full_text"], "I'm here for you.");
    let ttft = done["ttft_ms"].as_f64().unwrap();
    let total = done["total_ms"].as_f64().unwrap();
    assert!(ttft <= total);

    // Upstream received the server-built prompt
    let requests = upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["stream"], true);
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "You are a test assistant.");
    assert_eq!(body["messages"][1]["content"], "Be brief.");
    assert_eq!(body["messages"][2]["role"], "user");
    assert_eq!(body["messages"][2]["content"], "Hello");

    let records = state.usage.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].session_id, session_id);

    let debug: Value = reqwest::get(format!("http://{addr}/billing-debug"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(debug["total_sessions"], 1);
    assert_eq!(debug["records"][0]["model"], "gpt-4o-mini");
    assert!(debug["records"][0].get("text").is_none());
}

#[tokio::test]
async fn test_empty_message_never_reaches_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let (addr, _state) = spawn_server(mock_config(&upstream.uri())).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/chat")).await.unwrap();
    next_event(&mut ws).await;

    send_user_message(&mut ws, json!({"type": "user_message", "text": ""})).await;
    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "error");
    assert_eq!(event["code"], "input_error");

    ws.send(Message::Text("not json".into())).await.unwrap();
    let event = next_event(&mut ws).await;
    assert_eq!(event["code"], "parse_error");
}

#[tokio::test]
async fn test_upstream_rejection_is_sanitized() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided: sk-test", "type": "invalid_request_error"}
        })))
        .mount(&upstream)
        .await;

    let (addr, state) = spawn_server(mock_config(&upstream.uri())).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/chat")).await.unwrap();
    next_event(&mut ws).await;

    send_user_message(&mut ws, json!({"type": "user_message", "text": "Hello"})).await;
    let events = collect_turn(&mut ws).await;

    assert_eq!(events.len(), 1);
    let error = &events[0];
    assert_eq!(error["code"], "upstream_error");
    assert!(!error["message"].as_str().unwrap().contains("sk-test"));
    assert!(state.usage.is_empty());

    // The session accepts another turn after a failure
    send_user_message(&mut ws, json!({"type": "user_message", "text": "Again"})).await;
    let events = collect_turn(&mut ws).await;
    assert_eq!(events.last().unwrap()["code"], "upstream_error");
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(&["late"]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&upstream)
        .await;

    let config = chat_relay_gateway::ServerConfig {
        upstream_idle_timeout_seconds: 1,
        ..mock_config(&upstream.uri())
    };
    let (addr, _state) = spawn_server(config).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/chat")).await.unwrap();
    next_event(&mut ws).await;

    send_user_message(&mut ws, json!({"type": "user_message", "text": "Hello"})).await;
    let events = collect_turn(&mut ws).await;
    assert_eq!(events.last().unwrap()["code"], "upstream_timeout");
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let upstream = MockServer::start().await;
    mount_sse(&upstream, &["ok"]).await;

    let (addr, state) = spawn_server(mock_config(&upstream.uri())).await;
    let url = format!("ws://{addr}/ws/chat");
    let (mut a, _) = connect_async(&url).await.unwrap();
    let (mut b, _) = connect_async(&url).await.unwrap();

    let id_a = next_event(&mut a).await["session_id"].clone();
    let id_b = next_event(&mut b).await["session_id"].clone();
    assert_ne!(id_a, id_b);

    send_user_message(&mut a, json!({"type": "user_message", "text": "one"})).await;
    send_user_message(&mut b, json!({"type": "user_message", "text": "two"})).await;
    assert_eq!(collect_turn(&mut a).await.last().unwrap()["type"], "done");
    assert_eq!(collect_turn(&mut b).await.last().unwrap()["type"], "done");
    assert_eq!(state.usage.len(), 2);
}

#[tokio::test]
async fn test_per_ip_connection_limit() {
    let upstream = MockServer::start().await;
    let config = chat_relay_gateway::ServerConfig {
        max_connections_per_ip: 1,
        ..mock_config(&upstream.uri())
    };
    let (addr, state) = spawn_server(config).await;
    let url = format!("ws://{addr}/ws/chat");

    let (mut first, _) = connect_async(&url).await.unwrap();
    next_event(&mut first).await;
    assert!(connect_async(&url).await.is_err());

    // Closing the first socket frees the slot
    first.close(None).await.unwrap();
    for _ in 0..100 {
        if state.ws_connection_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.ws_connection_count(), 0);
    assert!(connect_async(&url).await.is_ok());
}

#[tokio::test]
async fn test_oversized_message_gets_input_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let config = chat_relay_gateway::ServerConfig {
        max_message_bytes: 1024,
        ..mock_config(&upstream.uri())
    };
    let (addr, _state) = spawn_server(config).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/chat")).await.unwrap();
    next_event(&mut ws).await;

    send_user_message(
        &mut ws,
        json!({"type": "user_message", "text": "x".repeat(4096)}),
    )
    .await;
    let event = next_event(&mut ws).await;
    assert_eq!(event["code"], "input_error");

    // Still open after the rejection
    ws.send(Message::Text("not json".into())).await.unwrap();
    assert_eq!(next_event(&mut ws).await["code"], "parse_error");
}

#[tokio::test]
async fn test_configured_limit_above_one_mebibyte_is_reachable() {
    let upstream = MockServer::start().await;
    mount_sse(&upstream, &["got it"]).await;

    let config = chat_relay_gateway::ServerConfig {
        max_message_bytes: 2 * 1024 * 1024,
        ..mock_config(&upstream.uri())
    };
    let (addr, _state) = spawn_server(config).await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/chat")).await.unwrap();
    next_event(&mut ws).await;

    let text = "y".repeat(1536 * 1024);
    send_user_message(&mut ws, json!({"type": "user_message", "text": text})).await;
    let events = collect_turn(&mut ws).await;
    assert_eq!(events.last().unwrap()["type"], "done");
}
