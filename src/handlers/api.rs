use axum::{Json, response::Html};
use serde_json::{Value, json};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Liveness probe
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Single-page chat UI
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
