//! Per-connection chat session.
//!
//! One [`ChatSession`] owns a client connection for its whole lifetime. It
//! multiplexes client frames and upstream fragments in a single `select!`
//! loop, so messages that arrive while a response is streaming are seen (and
//! rejected) immediately.
//!
//! ```text
//! AwaitingUserInput --user_message--> StreamingResponse
//! StreamingResponse --done/error----> AwaitingUserInput
//! any               --disconnect----> Closed
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::select;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::{
    ChatIncomingMessage, ChatOutgoingMessage, ErrorCode, MessageLimits, parse_incoming,
};
use super::prompt::PromptBuilder;
use crate::core::latency::LatencyTracker;
use crate::core::llm::{ChatCompletionProvider, ChatStream, LLMError};
use crate::core::usage::{UsageRecord, UsageRecorder};

/// Default inactivity timeout between upstream fragments
pub const DEFAULT_UPSTREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default client inactivity timeout while no turn is running
pub const DEFAULT_CLIENT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// The client can no longer receive events.
#[derive(Debug, Error)]
#[error("client connection closed")]
pub struct SinkClosed;

/// Destination for outgoing events.
#[async_trait]
pub trait EventSink: Send {
    async fn send(&mut self, message: ChatOutgoingMessage) -> Result<(), SinkClosed>;

    /// Ask the transport to close the connection.
    async fn close(&mut self) {}
}

/// Transport-independent view of one client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Binary,
    /// Ping or pong
    Control,
    Close,
}

/// Connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    AwaitingUserInput,
    StreamingResponse,
    Closed,
}

/// Everything a session needs that is shared across connections.
#[derive(Clone)]
pub struct RelayContext {
    pub provider: Arc<dyn ChatCompletionProvider>,
    pub prompt: Arc<PromptBuilder>,
    pub usage: Arc<dyn UsageRecorder>,
    pub limits: MessageLimits,
    pub upstream_idle_timeout: Duration,
    pub client_idle_timeout: Duration,
}

/// In-flight turn. Dropping it drops the upstream stream and abandons the request.
struct ActiveTurn {
    stream: ChatStream,
    transcript: String,
    latency: LatencyTracker,
    chunks: usize,
    /// Reset on every fragment
    idle_deadline: Instant,
}

enum UpstreamEvent {
    Fragment(String),
    Finished,
    Failed(LLMError),
    TimedOut,
}

enum SessionEvent {
    Client(Option<ClientFrame>),
    Upstream(UpstreamEvent),
    ClientIdle,
}

pub struct ChatSession<S> {
    id: String,
    ctx: RelayContext,
    sink: S,
    phase: ConnectionPhase,
    turn: Option<ActiveTurn>,
    turns_completed: u64,
}

impl<S: EventSink> ChatSession<S> {
    pub fn new(ctx: RelayContext, sink: S) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ctx,
            sink,
            phase: ConnectionPhase::AwaitingUserInput,
            turn: None,
            turns_completed: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Drive the session until the client goes away.
    ///
    /// Returns the final phase, which is always [`ConnectionPhase::Closed`].
    pub async fn run<I>(mut self, mut incoming: I) -> ConnectionPhase
    where
        I: Stream<Item = ClientFrame> + Unpin + Send,
    {
        info!(session_id = %self.id, model = %self.ctx.provider.model(), "Chat session started");

        let created = ChatOutgoingMessage::SessionCreated {
            session_id: self.id.clone(),
            model: self.ctx.provider.model().to_string(),
        };
        if !self.emit(created).await {
            return self.shutdown().await;
        }

        let mut last_activity = Instant::now();

        while self.phase != ConnectionPhase::Closed {
            let idle = self.turn.is_none();
            let idle_deadline = last_activity + self.ctx.client_idle_timeout;

            let event = select! {
                frame = incoming.next() => SessionEvent::Client(frame),
                upstream = next_upstream(&mut self.turn) => SessionEvent::Upstream(upstream),
                _ = sleep_until(idle_deadline), if idle => SessionEvent::ClientIdle,
            };

            match event {
                SessionEvent::Client(frame) => {
                    last_activity = Instant::now();
                    self.process_client_frame(frame).await;
                }
                SessionEvent::Upstream(upstream) => {
                    self.process_upstream_event(upstream).await;
                    if self.turn.is_none() {
                        last_activity = Instant::now();
                    }
                }
                SessionEvent::ClientIdle => {
                    info!(
                        session_id = %self.id,
                        idle_secs = self.ctx.client_idle_timeout.as_secs(),
                        "Chat session idle, closing"
                    );
                    self.phase = ConnectionPhase::Closed;
                }
            }
        }

        self.shutdown().await
    }

    async fn process_client_frame(&mut self, frame: Option<ClientFrame>) {
        match frame {
            None | Some(ClientFrame::Close) => {
                debug!(session_id = %self.id, "Client closed the connection");
                self.phase = ConnectionPhase::Closed;
            }
            Some(ClientFrame::Control) => {}
            Some(ClientFrame::Binary) => {
                self.emit(ChatOutgoingMessage::error(
                    ErrorCode::InputError,
                    "Binary frames are not supported",
                ))
                .await;
            }
            Some(ClientFrame::Text(text)) => match parse_incoming(&text) {
                Ok(message) => self.process_incoming_message(message).await,
                Err(reason) => {
                    debug!(session_id = %self.id, bytes = text.len(), "Unparseable client frame");
                    self.emit(ChatOutgoingMessage::error(ErrorCode::ParseError, reason))
                        .await;
                }
            },
        }
    }

    async fn process_incoming_message(&mut self, message: ChatIncomingMessage) {
        match message {
            ChatIncomingMessage::UserMessage { text, instructions } => {
                self.handle_turn(text, instructions).await;
            }
        }
    }

    /// Validate a user message and start streaming the response.
    async fn handle_turn(&mut self, text: String, instructions: Option<String>) {
        if self.turn.is_some() {
            debug!(session_id = %self.id, "Rejected message during active turn");
            self.emit(ChatOutgoingMessage::error(
                ErrorCode::TurnInProgress,
                "A response is still streaming; wait for it to finish",
            ))
            .await;
            return;
        }

        if let Err(reason) = self.ctx.limits.validate(&text, instructions.as_deref()) {
            debug!(session_id = %self.id, bytes = text.len(), "Rejected invalid user message");
            self.emit(ChatOutgoingMessage::error(ErrorCode::InputError, reason))
                .await;
            return;
        }

        let messages = self.ctx.prompt.build(&text, instructions.as_deref());

        info!(
            session_id = %self.id,
            text_bytes = text.len(),
            has_instructions = instructions.is_some(),
            "Turn started"
        );

        self.turn = Some(ActiveTurn {
            stream: self.ctx.provider.stream_chat(messages),
            transcript: String::new(),
            latency: LatencyTracker::started(),
            chunks: 0,
            idle_deadline: Instant::now() + self.ctx.upstream_idle_timeout,
        });
        self.phase = ConnectionPhase::StreamingResponse;
    }

    async fn process_upstream_event(&mut self, event: UpstreamEvent) {
        match event {
            UpstreamEvent::Fragment(fragment) => {
                if fragment.is_empty() {
                    return;
                }
                let Some(turn) = self.turn.as_mut() else {
                    return;
                };
                turn.latency.mark_first_token();
                turn.transcript.push_str(&fragment);
                turn.chunks += 1;
                turn.idle_deadline = Instant::now() + self.ctx.upstream_idle_timeout;

                self.emit(ChatOutgoingMessage::Chunk { text: fragment }).await;
            }
            UpstreamEvent::Finished => self.finish_turn().await,
            UpstreamEvent::Failed(error) => {
                self.fail_turn(ErrorCode::UpstreamError, error.client_message(), &error)
                    .await;
            }
            UpstreamEvent::TimedOut => {
                let error = LLMError::Timeout(format!(
                    "no data for {}s",
                    self.ctx.upstream_idle_timeout.as_secs_f64()
                ));
                self.fail_turn(ErrorCode::UpstreamTimeout, error.client_message(), &error)
                    .await;
            }
        }
    }

    async fn finish_turn(&mut self) {
        let Some(mut turn) = self.end_turn() else {
            return;
        };
        let latency = turn.latency.complete();

        info!(
            session_id = %self.id,
            chunks = turn.chunks,
            response_bytes = turn.transcript.len(),
            ttft_ms = ?latency.ttft_ms(),
            total_ms = latency.total_ms(),
            "Turn completed"
        );

        let full_text = std::mem::take(&mut turn.transcript);
        drop(turn);

        if self
            .emit(ChatOutgoingMessage::done(full_text, latency))
            .await
        {
            self.turns_completed += 1;
            self.ctx.usage.record(UsageRecord::new(
                self.id.clone(),
                latency.total_duration,
                self.ctx.provider.model(),
            ));
        }
    }

    async fn fail_turn(&mut self, code: ErrorCode, client_message: String, error: &LLMError) {
        let Some(mut turn) = self.end_turn() else {
            return;
        };
        turn.latency.finish();

        warn!(
            session_id = %self.id,
            chunks = turn.chunks,
            elapsed_ms = turn.latency.measurement().map(|m| m.total_ms()),
            error = %error,
            "Turn failed"
        );
        drop(turn);

        self.emit(ChatOutgoingMessage::error(code, client_message))
            .await;
    }

    fn end_turn(&mut self) -> Option<ActiveTurn> {
        let turn = self.turn.take();
        if self.phase == ConnectionPhase::StreamingResponse {
            self.phase = ConnectionPhase::AwaitingUserInput;
        }
        turn
    }

    /// Send one event. A failed send closes the session.
    async fn emit(&mut self, message: ChatOutgoingMessage) -> bool {
        if self.phase == ConnectionPhase::Closed {
            return false;
        }
        match self.sink.send(message).await {
            Ok(()) => true,
            Err(SinkClosed) => {
                debug!(session_id = %self.id, "Client sink closed");
                self.phase = ConnectionPhase::Closed;
                false
            }
        }
    }

    async fn shutdown(mut self) -> ConnectionPhase {
        if let Some(turn) = self.turn.take() {
            debug!(
                session_id = %self.id,
                chunks = turn.chunks,
                "Abandoning in-flight upstream request"
            );
        }
        self.phase = ConnectionPhase::Closed;
        self.sink.close().await;

        info!(
            session_id = %self.id,
            turns = self.turns_completed,
            "Chat session closed"
        );
        self.phase
    }
}

/// Next upstream event for the active turn; pending forever when idle.
async fn next_upstream(turn: &mut Option<ActiveTurn>) -> UpstreamEvent {
    let Some(turn) = turn.as_mut() else {
        return std::future::pending().await;
    };

    match timeout_at(turn.idle_deadline, turn.stream.next()).await {
        Ok(Some(Ok(fragment))) => UpstreamEvent::Fragment(fragment),
        Ok(Some(Err(error))) => UpstreamEvent::Failed(error),
        Ok(None) => UpstreamEvent::Finished,
        Err(_) => UpstreamEvent::TimedOut,
    }
}
