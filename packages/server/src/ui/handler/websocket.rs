//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::{
    extract::{State, ws::WebSocketUpgrade},
    response::IntoResponse,
};

use crate::ui::{session, state::AppState};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.read_buffer_size(state.websocket.read)
        .write_buffer_size(state.websocket.write)
        .on_failed_upgrade(|e| session::upgrade_failed(&e))
        .on_upgrade(move |socket| session::run(socket, state))
}
