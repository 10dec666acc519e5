use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::core::usage::UsageRecord;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UsageDebugResponse {
    pub note: &'static str,
    pub total_sessions: usize,
    pub records: Vec<UsageRecord>,
}

/// Retained usage records. Answers 404 unless `usage_debug_enabled` is set.
pub async fn billing_debug(State(state): State<Arc<AppState>>) -> AppResult<Json<UsageDebugResponse>> {
    if !state.config.usage_debug_enabled {
        return Err(AppError::NotFound("Not found".to_string()));
    }

    let records = state.usage.snapshot();
    Ok(Json(UsageDebugResponse {
        note: "Debug endpoint; records hold session metadata only",
        total_sessions: records.len(),
        records,
    }))
}
