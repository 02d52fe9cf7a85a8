//! Kafka producer behind `MessagePublisher`.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{
    ClientConfig,
    producer::{DeliveryFuture, FutureProducer, FutureRecord, Producer},
};
use tokio::sync::mpsc;

use crate::{
    domain::{BoxError, ChatError, ChatMessage, MessagePublisher},
    infrastructure::dto::websocket::MessagePayload,
};

use super::retry::RetryPolicy;

const METADATA_TIMEOUT: Duration = Duration::from_secs(1);

/// Where the cluster is and which topic carries chat messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSettings {
    /// Comma separated `host:port` list
    pub brokers: String,
    pub topic: String,
}

impl KafkaSettings {
    pub(crate) fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.brokers);
        config
    }
}

/// Fire-and-forget publisher.
///
/// `publish` returns as soon as librdkafka queued the record. Delivery
/// reports are awaited by a background task that only logs failures.
pub struct KafkaMessagePublisher {
    producer: FutureProducer,
    topic: String,
    deliveries: mpsc::UnboundedSender<DeliveryFuture>,
}

impl KafkaMessagePublisher {
    /// Create the producer and wait until the cluster answers a metadata
    /// request, retrying per `policy`.
    ///
    /// # Errors
    ///
    /// `ChatError::FatalStartup` once every attempt failed.
    pub async fn connect(settings: &KafkaSettings, policy: RetryPolicy) -> Result<Self, ChatError> {
        let producer = policy
            .retry("kafka producer connection", || create_producer(settings))
            .await
            .map_err(|e| ChatError::fatal_startup("cannot connect kafka producer", e))?;

        let (deliveries, pending) = mpsc::unbounded_channel();
        tokio::spawn(drain_deliveries(pending));

        tracing::info!(brokers = %settings.brokers, topic = %settings.topic, "kafka producer ready");
        Ok(Self {
            producer,
            topic: settings.topic.clone(),
            deliveries,
        })
    }

    /// Wait up to `timeout` for every queued record to be delivered.
    ///
    /// The delivery drain stops once the publisher is dropped.
    pub async fn flush(&self, timeout: Duration) -> Result<(), ChatError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| ChatError::transient("kafka flush task failed", e))?
            .map_err(|e| ChatError::transient("cannot flush kafka producer", e))
    }
}

async fn create_producer(settings: &KafkaSettings) -> Result<FutureProducer, BoxError> {
    let producer: FutureProducer = settings
        .client_config()
        .set("acks", "1")
        .set("compression.type", "snappy")
        .set("linger.ms", "500")
        .set("message.timeout.ms", "5000")
        .create()?;

    // Creating the client never touches the network; ask for metadata to
    // find out whether the cluster is up.
    let probe = producer.clone();
    let topic = settings.topic.clone();
    tokio::task::spawn_blocking(move || {
        probe
            .client()
            .fetch_metadata(Some(&topic), METADATA_TIMEOUT)
            .map(|_| ())
    })
    .await??;

    Ok(producer)
}

async fn drain_deliveries(mut pending: mpsc::UnboundedReceiver<DeliveryFuture>) {
    while let Some(delivery) = pending.recv().await {
        match delivery.await {
            Ok(Ok(_)) => {}
            Ok(Err((e, _))) => tracing::error!(error = %e, "failed to produce message"),
            Err(_) => tracing::error!("delivery report dropped before completion"),
        }
    }
}

#[async_trait]
impl MessagePublisher for KafkaMessagePublisher {
    async fn publish(&self, message: &ChatMessage) -> Result<(), ChatError> {
        let encoded = MessagePayload::from(message).encode()?;
        let record = FutureRecord::<(), str>::to(&self.topic).payload(encoded.as_str());

        let delivery = self
            .producer
            .send_result(record)
            .map_err(|(e, _)| ChatError::transient("kafka refused the message", e))?;

        if self.deliveries.send(delivery).is_err() {
            tracing::warn!("delivery drain stopped, report discarded");
        }
        tracing::debug!(username = %message.username(), "message produced");
        Ok(())
    }
}
