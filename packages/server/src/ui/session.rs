//! Per-connection session.
//!
//! A session moves `Connecting -> Active -> Closing -> Closed`. On becoming
//! active it registers with the registry and replays history; it then reads
//! frames until the client leaves or the transport fails. Whatever ends the
//! session, the registration is dropped before the transport is released,
//! and both happen on every exit path including unwinding.

use std::{ops::ControlFlow, sync::Arc};

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::{
    domain::{ChatError, ChatMessage, ConnectionId, ValidationError},
    infrastructure::{ConnectionHandle, dto::websocket::MessagePayload},
    ui::state::AppState,
};

const HISTORY_FAILURE_REASON: &str = "cannot load last messages";

type FrameSink = SplitSink<WebSocket, Message>;

/// Lifecycle of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    /// Whether a session in `self` may move to `next`.
    fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Active)
                | (Self::Connecting, Self::Closed)
                | (Self::Active, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }
}

struct Lifecycle {
    state: SessionState,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: SessionState::Connecting,
        }
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_become(next),
            "illegal session transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(from = ?self.state, to = ?next, "session state changed");
        self.state = next;
    }
}

/// Close out a connection whose upgrade failed. Nothing was registered.
pub(crate) fn upgrade_failed(error: &axum::Error) {
    let id = ConnectionId::generate();
    let _entered = tracing::info_span!("session", connection_id = %id).entered();
    tracing::warn!(%error, "websocket upgrade failed");
    Lifecycle::new().advance(SessionState::Closed);
}

/// Drive one upgraded connection to completion.
pub async fn run(socket: WebSocket, state: Arc<AppState>) {
    let _tracked = state.sessions.token();
    let id = ConnectionId::generate();
    let span = tracing::info_span!("session", connection_id = %id);
    drive(socket, state, id).instrument(span).await;
}

async fn drive(socket: WebSocket, state: Arc<AppState>, id: ConnectionId) {
    let mut lifecycle = Lifecycle::new();
    let (mut sink, stream) = socket.split();
    let (handle, mut outbound) = ConnectionHandle::channel(id);

    lifecycle.advance(SessionState::Active);
    let registration = state.registry.register(handle.clone());
    tracing::info!(connections = state.registry.len(), "client connected");

    if replay_history(&mut sink, &state).await.is_continue() {
        // Frames queued during the replay are written once the writer starts.
        tokio::select! {
            _ = read_inbound(stream, &state, &handle) => {}
            _ = write_outbound(&mut sink, &mut outbound) => {}
        }
    }

    lifecycle.advance(SessionState::Closing);
    drop(registration);
    drop(handle);
    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "transport already closed");
    }
    lifecycle.advance(SessionState::Closed);
    tracing::info!(connections = state.registry.len(), "client disconnected");
}

/// Send the recent history, oldest first, straight to the transport.
///
/// Breaks when the history cannot be loaded (the client is sent a close
/// frame) or a write fails.
async fn replay_history(sink: &mut FrameSink, state: &AppState) -> ControlFlow<()> {
    let history = match state.load_history.load_recent(state.messages_to_load).await {
        Ok(messages) => messages,
        Err(ChatError::NotFound) => {
            tracing::debug!("no history yet");
            Vec::new()
        }
        Err(e) => {
            tracing::error!(error = %e, "cannot load last messages");
            let frame = CloseFrame {
                code: close_code::ERROR,
                reason: HISTORY_FAILURE_REASON.into(),
            };
            if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                tracing::debug!(error = %e, "cannot send close frame");
            }
            return ControlFlow::Break(());
        }
    };

    for message in &history {
        let text = match MessagePayload::from(message).encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "cannot encode history message");
                return ControlFlow::Break(());
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::debug!(error = %e, "cannot replay history");
            return ControlFlow::Break(());
        }
    }
    tracing::debug!(count = history.len(), "history replayed");
    ControlFlow::Continue(())
}

/// Read frames until the client closes or the transport fails.
///
/// Payloads are handled inline, so one connection's messages are published
/// and broadcast in the order they arrived.
async fn read_inbound(
    mut stream: SplitStream<WebSocket>,
    state: &AppState,
    handle: &ConnectionHandle,
) {
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, "cannot read frame");
                return;
            }
        };

        match frame {
            Message::Text(text) => handle_payload(state, handle, text.as_str()).await,
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_payload(state, handle, text).await,
                Err(e) => send_notice(handle, &ValidationError::Decode(e.to_string())),
            },
            Message::Close(frame) => {
                tracing::debug!(?frame, "client requested close");
                return;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

async fn handle_payload(state: &AppState, handle: &ConnectionHandle, text: &str) {
    match state.send_message.execute(text).await {
        Ok(report) => tracing::debug!(
            delivered = report.delivered,
            failed = report.failed,
            "message broadcast"
        ),
        Err(ChatError::Validation(reason)) => {
            tracing::info!(%reason, "message rejected");
            send_notice(handle, &reason);
        }
        Err(e) => tracing::error!(error = %e, "cannot send message"),
    }
}

/// Queue a rejection notice for this connection only.
fn send_notice(handle: &ConnectionHandle, reason: &ValidationError) {
    let notice = ChatMessage::notice(reason);
    match MessagePayload::from(&notice).encode() {
        Ok(text) => {
            if let Err(e) = handle.send(text) {
                tracing::debug!(error = %e, "notice dropped");
            }
        }
        Err(e) => tracing::error!(error = %e, "cannot encode notice"),
    }
}

async fn write_outbound(sink: &mut FrameSink, outbound: &mut mpsc::Receiver<String>) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::debug!(error = %e, "cannot write frame");
            return;
        }
    }
}
