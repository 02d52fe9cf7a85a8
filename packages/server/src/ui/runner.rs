//! Router construction and the serve loop with graceful shutdown.

use std::{future::IntoFuture, io, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::{net::TcpListener, time::Instant};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use super::{
    handler::{health_check, websocket_handler},
    state::AppState,
};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/chat", get(websocket_handler))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
///
/// After cancellation no new connection is accepted; open HTTP connections
/// and live sessions get `grace` to finish before this returns. Sessions are
/// never cancelled, they end when their client leaves.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
    grace: Duration,
) -> io::Result<()> {
    tracing::info!("listening on {}", listener.local_addr()?);

    let app = create_router(Arc::clone(&state));
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future();
    let mut server = tokio::spawn(server);

    tokio::select! {
        finished = &mut server => return finished.map_err(io::Error::other)?,
        _ = shutdown.cancelled() => {}
    }

    tracing::info!(grace_secs = grace.as_secs_f64(), "shutting down");
    let deadline = Instant::now() + grace;
    match tokio::time::timeout_at(deadline, &mut server).await {
        Ok(finished) => finished.map_err(io::Error::other)??,
        Err(_) => {
            tracing::warn!("http connections still open after grace period");
            server.abort();
        }
    }

    state.sessions.close();
    if tokio::time::timeout_at(deadline, state.sessions.wait())
        .await
        .is_err()
    {
        tracing::warn!(
            sessions = state.sessions.len(),
            "sessions still open after grace period"
        );
    }
    Ok(())
}
