//! Transcription and synthesis REST handlers
//!
//! Request text and audio are never logged; only sizes and outcomes.

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::stt::{AudioUpload, STTError};
use crate::core::tts::SpeechRequest;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the audio file
const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SynthesisBody {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// `POST /api/stt`
///
/// Expects a multipart form with an `audio` file field and answers
/// `{"text": "..."}`.
pub async fn speech_to_text(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<TranscriptionResponse>> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let upload = read_audio_field(&mut multipart, state.config.max_audio_bytes).await?;

    let audio_bytes = upload.data.len();
    let text = state.transcriber.transcribe(upload).await?;

    info!(audio_bytes, text_chars = text.chars().count(), "Transcription completed");
    Ok(Json(TranscriptionResponse { text }))
}

/// Read the `audio` field, enforcing the size limit while streaming.
async fn read_audio_field(multipart: &mut Multipart, limit: usize) -> AppResult<AudioUpload> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            let size = data.len() + chunk.len();
            if size > limit {
                return Err(STTError::AudioTooLarge { size, limit }.into());
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(STTError::InvalidAudio("Audio file is empty".to_string()).into());
        }

        debug!(audio_bytes = data.len(), "Received audio upload");
        return Ok(AudioUpload::new(data.freeze())
            .with_file_name(file_name.as_deref())
            .with_content_type(content_type.as_deref()));
    }

    Err(STTError::InvalidAudio("Missing 'audio' file field".to_string()).into())
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// `POST /api/tts`
///
/// Answers with the audio bytes, the matching content type and an inline
/// content disposition.
pub async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SynthesisBody>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let request = SpeechRequest::parse(
        &body.text,
        body.voice.as_deref(),
        body.format.as_deref(),
        state.synthesizer.default_voice(),
    )?;

    let voice = request.voice;
    let audio = state.synthesizer.synthesize(request).await?;

    info!(
        voice = %voice,
        format = %audio.format,
        audio_bytes = audio.data.len(),
        "Speech synthesis completed"
    );

    let disposition = HeaderValue::from_str(&audio.content_disposition())
        .map_err(|_| AppError::Internal("Speech synthesis failed".to_string()))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(audio.format.mime_type()),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        audio.data,
    )
        .into_response())
}
