//! Test fixtures: an in-process server on an ephemeral port.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use chatline_server::{
    MemoryBackend,
    domain::{ChatError, ChatMessage, MessageCache, MessageStore},
    ui::{AppState, WebSocketBuffers},
    usecase::BroadcastOrdering,
};
use futures_util::{SinkExt, StreamExt};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tokio_util::sync::CancellationToken;

pub type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const WAIT: Duration = Duration::from_secs(3);

pub struct TestServer {
    addr: SocketAddr,
    pub backend: MemoryBackend,
    pub state: Arc<AppState>,
    shutdown: CancellationToken,
    _server: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(BroadcastOrdering::PublishFirst, 10).await
    }

    pub async fn start_with(ordering: BroadcastOrdering, messages_to_load: usize) -> Self {
        let backend = MemoryBackend::new("chat-messages");
        let state = backend.app_state(ordering, messages_to_load, WebSocketBuffers::default());
        Self::launch(backend, state).await
    }

    /// A server whose history can be read from neither cache nor storage.
    pub async fn start_with_unreadable_history() -> Self {
        let backend = MemoryBackend::new("chat-messages");
        let state = AppState::new(
            backend.broker.clone(),
            Arc::new(UnavailableStore),
            Arc::new(UnavailableCache),
            BroadcastOrdering::PublishFirst,
            10,
            WebSocketBuffers::default(),
        );
        Self::launch(backend, state).await
    }

    async fn launch(backend: MemoryBackend, state: Arc<AppState>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        backend.spawn_consumer(CancellationToken::new());

        let shutdown = CancellationToken::new();
        let server = tokio::spawn(chatline_server::ui::serve(
            listener,
            state.clone(),
            shutdown.clone(),
            Duration::from_secs(1),
        ));

        Self {
            addr,
            backend,
            state,
            shutdown,
            _server: server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/api/v1/chat", self.addr)
    }

    /// Connect a client and wait until its session is registered.
    pub async fn connect(&self) -> Client {
        let expected = self.state.registry.len() + 1;
        let (client, _) = connect_async(self.ws_url())
            .await
            .expect("Failed to connect WebSocket");
        self.wait_until(|| self.state.registry.len() >= expected).await;
        client
    }

    /// Poll `condition` until it holds, failing the test after a timeout.
    pub async fn wait_until(&self, condition: impl Fn() -> bool) {
        tokio::time::timeout(WAIT, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Condition not met in time");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.backend.broker.close();
    }
}

fn refused() -> ChatError {
    ChatError::transient("connection refused", "backend is down")
}

pub struct UnavailableStore;

#[async_trait]
impl MessageStore for UnavailableStore {
    async fn insert(&self, _message: &ChatMessage) -> Result<(), ChatError> {
        Err(refused())
    }

    async fn select_recent(&self, _limit: usize) -> Result<Vec<ChatMessage>, ChatError> {
        Err(refused())
    }
}

pub struct UnavailableCache;

#[async_trait]
impl MessageCache for UnavailableCache {
    async fn push_recent(&self, _payload: &[u8]) -> Result<(), ChatError> {
        Err(refused())
    }

    async fn range_recent(&self, _count: usize) -> Result<Vec<Vec<u8>>, ChatError> {
        Err(refused())
    }
}

pub async fn send_text(client: &mut Client, text: &str) {
    client
        .send(Message::text(text))
        .await
        .expect("Failed to send message");
}

/// Next text frame, skipping control frames.
pub async fn recv_text(client: &mut Client) -> String {
    tokio::time::timeout(WAIT, async {
        loop {
            let frame = client
                .next()
                .await
                .expect("Connection closed")
                .expect("Failed to read frame");
            match frame {
                Message::Text(text) => return text.as_str().to_string(),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("Unexpected frame: {other:?}"),
            }
        }
    })
    .await
    .expect("No message received in time")
}

/// Assert no text frame arrives within a short window.
pub async fn assert_silent(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "Unexpected frame: {result:?}");
}
