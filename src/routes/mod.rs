pub mod api;
pub mod chat;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

/// All application routes with state applied.
///
/// Only the chat socket route goes through the connection limit middleware;
/// unmatched paths fall through to the default 404. CORS, rate
/// limiting and security headers are added by the binary.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    let chat_routes = chat::create_chat_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        connection_limit_middleware,
    ));

    api::create_api_router()
        .merge(chat_routes)
        .with_state(state)
}
