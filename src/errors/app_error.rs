//! HTTP-facing error type.
//!
//! Every variant renders as `{"error": "<message>"}` with a matching status.
//! Provider details stay in the logs; only sanitized text reaches the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::stt::STTError;
use crate::core::tts::TTSError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    NotFound(String),

    /// Upstream or internal failure; carries the already-sanitized message
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<STTError> for AppError {
    fn from(e: STTError) -> Self {
        let message = e.client_message();
        match e {
            STTError::InvalidAudio(_) => Self::BadRequest(message),
            STTError::AudioTooLarge { .. } => Self::PayloadTooLarge(message),
            other => {
                error!(error = %other, "Transcription failed");
                Self::Internal(message)
            }
        }
    }
}

impl From<TTSError> for AppError {
    fn from(e: TTSError) -> Self {
        let message = e.client_message();
        match e {
            TTSError::InvalidRequest(_) => Self::BadRequest(message),
            other => {
                error!(error = %other, "Speech synthesis failed");
                Self::Internal(message)
            }
        }
    }
}
