//! Shared application state.

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::{
    domain::{MessageCache, MessagePublisher, MessageStore},
    infrastructure::{ConnectionRegistry, RegistryBroadcaster},
    usecase::{BroadcastOrdering, LoadHistoryUseCase, SendMessageUseCase},
};

/// Transport buffer sizes applied to every WebSocket upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebSocketBuffers {
    pub read: usize,
    pub write: usize,
}

impl Default for WebSocketBuffers {
    fn default() -> Self {
        Self {
            read: 128 * 1024,
            write: 128 * 1024,
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Live connections, shared with the broadcaster
    pub registry: Arc<ConnectionRegistry>,
    pub send_message: SendMessageUseCase,
    pub load_history: LoadHistoryUseCase,
    /// History replayed to each new connection
    pub messages_to_load: usize,
    pub websocket: WebSocketBuffers,
    /// Running sessions, awaited on shutdown
    pub sessions: TaskTracker,
}

impl AppState {
    /// Wire the use cases to the given adapters.
    pub fn new(
        publisher: Arc<dyn MessagePublisher>,
        store: Arc<dyn MessageStore>,
        cache: Arc<dyn MessageCache>,
        ordering: BroadcastOrdering,
        messages_to_load: usize,
        websocket: WebSocketBuffers,
    ) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(RegistryBroadcaster::new(Arc::clone(&registry)));

        Arc::new(Self {
            registry,
            send_message: SendMessageUseCase::new(publisher, broadcaster, ordering),
            load_history: LoadHistoryUseCase::new(cache, store),
            messages_to_load,
            websocket,
            sessions: TaskTracker::new(),
        })
    }
}
