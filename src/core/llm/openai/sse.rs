//! Server-sent event decoding for chat completion bodies.
//!
//! Framing (line splitting across chunks, comments, multi-line `data`) is done
//! by `eventsource-stream`. This module only classifies the `data` payloads
//! and maps decoder failures onto [`LLMError`].

use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt, future};

use crate::core::llm::base::{LLMError, LLMResult};

/// Terminal marker used by OpenAI-compatible streams
pub const DONE_MARKER: &str = "[DONE]";

/// A dispatched SSE event we act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// `data:` payload (multiple data lines joined with `\n`)
    Data(String),
    /// `data: [DONE]`
    Done,
}

/// Decode a raw response body into data events.
///
/// Events without data (keep-alives, bare `event:`/`id:` lines) are skipped.
pub fn sse_events<S, B, E>(body: S) -> impl Stream<Item = LLMResult<SseEvent>> + Send
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]>,
    E: Into<LLMError> + Send,
{
    body.eventsource().filter_map(|event| {
        future::ready(match event {
            Ok(event) if event.data.is_empty() => None,
            Ok(event) if event.data.trim() == DONE_MARKER => Some(Ok(SseEvent::Done)),
            Ok(event) => Some(Ok(SseEvent::Data(event.data))),
            Err(e) => Some(Err(stream_error(e))),
        })
    })
}

fn stream_error<E: Into<LLMError>>(err: EventStreamError<E>) -> LLMError {
    match err {
        EventStreamError::Transport(e) => e.into(),
        EventStreamError::Utf8(e) => {
            LLMError::InvalidResponse(format!("Stream is not valid UTF-8: {e}"))
        }
        EventStreamError::Parser(e) => {
            LLMError::InvalidResponse(format!("Malformed event stream: {e}"))
        }
    }
}
