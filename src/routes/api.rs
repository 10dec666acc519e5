use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, speech, usage};
use crate::state::AppState;
use std::sync::Arc;

/// Create the public HTTP router: chat page, health, speech and usage routes.
///
/// The transcription route streams its body and enforces `max_audio_bytes`
/// itself, so the default body limit is lifted there.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health_check))
        .route(
            "/api/stt",
            post(speech::speech_to_text).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/tts", post(speech::text_to_speech))
        .route("/billing-debug", get(usage::billing_debug))
        .layer(TraceLayer::new_for_http())
}
