//! Process wiring for both binaries.

use std::sync::Arc;

use anyhow::Context;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Backend, ServerConfig, StorageConfig},
    domain::ChatError,
    infrastructure::{
        DurablePipelineConsumer,
        broker::{InMemoryBroker, KafkaMessagePublisher, KafkaRecordSource, RetryPolicy},
        repository::{
            InMemoryMessageCache, InMemoryMessageStore, PostgresMessageStore, RedisMessageCache,
        },
    },
    ui::{AppState, WebSocketBuffers, serve},
    usecase::{BroadcastOrdering, PersistMessageUseCase},
};

/// Consumer group of the pipeline consumer in memory mode.
pub const MEMORY_CONSUMER_GROUP: &str = "chat-storage";

/// In-process broker, store and cache.
pub struct MemoryBackend {
    pub broker: Arc<InMemoryBroker>,
    pub store: Arc<InMemoryMessageStore>,
    pub cache: Arc<InMemoryMessageCache>,
}

impl MemoryBackend {
    pub fn new(topic: &str) -> Self {
        Self {
            broker: InMemoryBroker::new(topic),
            store: Arc::new(InMemoryMessageStore::new()),
            cache: Arc::new(InMemoryMessageCache::new()),
        }
    }

    pub fn app_state(
        &self,
        ordering: BroadcastOrdering,
        messages_to_load: usize,
        websocket: WebSocketBuffers,
    ) -> Arc<AppState> {
        AppState::new(
            self.broker.clone(),
            self.store.clone(),
            self.cache.clone(),
            ordering,
            messages_to_load,
            websocket,
        )
    }

    /// Run the pipeline consumer on a background task.
    pub fn spawn_consumer(&self, shutdown: CancellationToken) -> JoinHandle<Result<(), ChatError>> {
        let policy = RetryPolicy::default();
        let consumer = DurablePipelineConsumer::new(
            self.broker.subscribe(MEMORY_CONSUMER_GROUP),
            PersistMessageUseCase::new(self.store.clone(), self.cache.clone()),
            policy.interval,
        );
        tokio::spawn(consumer.run(shutdown))
    }
}

/// Run the chat server until `shutdown` is cancelled.
pub async fn run_server(config: ServerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let messages_to_load = usize::from(config.messages_to_load);
    let grace = config.shutdown_grace();

    match config.backend {
        Backend::Memory => {
            let backend = MemoryBackend::new(&config.kafka.kafka_topic);
            // Stopped by closing the broker once the server is down, so every
            // accepted message is persisted first.
            let consumer = backend.spawn_consumer(CancellationToken::new());
            let state =
                backend.app_state(config.ordering(), messages_to_load, config.websocket_buffers());

            let listener = bind(&config).await?;
            serve(listener, state, shutdown.clone(), grace).await?;

            backend.broker.close();
            consumer
                .await
                .context("pipeline consumer task failed")?
                .context("pipeline consumer failed")?;
        }
        Backend::Kafka => {
            let settings = config.kafka.settings();
            let publisher =
                Arc::new(KafkaMessagePublisher::connect(&settings, RetryPolicy::default()).await?);
            let store = Arc::new(PostgresMessageStore::connect(&config.storage.database_url).await?);
            let cache = Arc::new(RedisMessageCache::new(
                &config.storage.redis_url,
                &config.storage.redis_key,
            )?);
            let state = AppState::new(
                publisher.clone(),
                store.clone(),
                cache,
                config.ordering(),
                messages_to_load,
                config.websocket_buffers(),
            );

            let listener = bind(&config).await?;
            serve(listener, state, shutdown.clone(), grace).await?;

            if let Err(e) = publisher.flush(grace).await {
                tracing::error!(error = %e, "cannot flush kafka producer");
            }
            store.close().await;
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

async fn bind(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    let address = config.bind_address();
    TcpListener::bind(&address)
        .await
        .with_context(|| format!("cannot bind {address}"))
}

/// Run the storage service until `shutdown` is cancelled.
pub async fn run_storage(config: StorageConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let settings = config.kafka.settings();
    let policy = RetryPolicy::default();

    let store = Arc::new(PostgresMessageStore::connect(&config.storage.database_url).await?);
    let cache = Arc::new(RedisMessageCache::new(
        &config.storage.redis_url,
        &config.storage.redis_key,
    )?);
    let source = KafkaRecordSource::connect(&settings, &config.kafka_group_id, policy).await?;

    let consumer = DurablePipelineConsumer::new(
        source,
        PersistMessageUseCase::new(store.clone(), cache),
        policy.interval,
    );
    let result = consumer.run(shutdown).await;

    store.close().await;
    result.context("pipeline consumer failed")?;
    tracing::info!("storage service stopped");
    Ok(())
}
