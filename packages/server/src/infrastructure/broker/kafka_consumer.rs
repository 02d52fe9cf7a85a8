//! Kafka consumer-group member behind `RecordSource`.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use rdkafka::{
    Message, Offset, TopicPartitionList,
    consumer::{CommitMode, Consumer, StreamConsumer},
};

use crate::domain::{BoxError, BrokerRecord, ChatError, RecordSource};

use super::{kafka::KafkaSettings, retry::RetryPolicy};

const METADATA_TIMEOUT: Duration = Duration::from_secs(1);

/// Subscription with manual offset management.
///
/// Auto-commit is off: an offset is committed only through `commit`, so a
/// record whose processing never finished is delivered again after a
/// restart.
pub struct KafkaRecordSource {
    consumer: Arc<StreamConsumer>,
    /// Next offset to read per (topic, partition), as acknowledged so far
    acked: HashMap<(String, i32), i64>,
    /// Record handed back by `rewind` when seeking failed, returned before
    /// reading on
    pending: Option<BrokerRecord>,
}

impl KafkaRecordSource {
    /// Join `group_id` and subscribe to the chat topic, retrying per
    /// `policy` until the cluster answers.
    ///
    /// # Errors
    ///
    /// `ChatError::FatalStartup` once every attempt failed.
    pub async fn connect(
        settings: &KafkaSettings,
        group_id: &str,
        policy: RetryPolicy,
    ) -> Result<Self, ChatError> {
        let consumer = policy
            .retry("kafka consumer group connection", || {
                create_consumer(settings, group_id)
            })
            .await
            .map_err(|e| ChatError::fatal_startup("cannot join kafka consumer group", e))?;

        tracing::info!(
            brokers = %settings.brokers,
            topic = %settings.topic,
            group_id,
            "kafka consumer ready"
        );
        Ok(Self::new(consumer))
    }

    fn new(consumer: Arc<StreamConsumer>) -> Self {
        Self {
            consumer,
            acked: HashMap::new(),
            pending: None,
        }
    }

    fn acked_offsets(&self) -> Result<TopicPartitionList, ChatError> {
        let mut list = TopicPartitionList::new();
        for ((topic, partition), offset) in &self.acked {
            list.add_partition_offset(topic, *partition, Offset::Offset(*offset))
                .map_err(|e| ChatError::transient("cannot build offset list", e))?;
        }
        Ok(list)
    }
}

async fn create_consumer(
    settings: &KafkaSettings,
    group_id: &str,
) -> Result<Arc<StreamConsumer>, BoxError> {
    let consumer: StreamConsumer = settings
        .client_config()
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("enable.partition.eof", "false")
        .create()?;
    consumer.subscribe(&[settings.topic.as_str()])?;

    let consumer = Arc::new(consumer);
    let probe = Arc::clone(&consumer);
    let topic = settings.topic.clone();
    tokio::task::spawn_blocking(move || {
        probe
            .fetch_metadata(Some(&topic), METADATA_TIMEOUT)
            .map(|_| ())
    })
    .await??;

    Ok(consumer)
}

#[async_trait]
impl RecordSource for KafkaRecordSource {
    async fn next_record(&mut self) -> Result<Option<BrokerRecord>, ChatError> {
        if let Some(record) = self.pending.take() {
            return Ok(Some(record));
        }

        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| ChatError::transient("cannot receive kafka record", e))?;

        Ok(Some(BrokerRecord {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        }))
    }

    fn commit(&mut self, record: &BrokerRecord) -> Result<(), ChatError> {
        // Kafka stores the offset of the next record to fetch.
        let next = record.offset + 1;
        self.acked
            .insert((record.topic.clone(), record.partition), next);

        let mut list = TopicPartitionList::new();
        list.add_partition_offset(&record.topic, record.partition, Offset::Offset(next))
            .map_err(|e| ChatError::transient("cannot build offset list", e))?;
        self.consumer
            .commit(&list, CommitMode::Async)
            .map_err(|e| ChatError::transient("cannot commit kafka offset", e))
    }

    /// Seek the partition back so the record is fetched again.
    ///
    /// The consumer keeps polling while storage is down, so it is not
    /// evicted from the group after `max.poll.interval.ms`. A zero timeout
    /// makes the seek asynchronous. If the partition is not assigned here
    /// the record is kept locally instead.
    fn rewind(&mut self, record: &BrokerRecord) -> Result<(), ChatError> {
        match self.consumer.seek(
            &record.topic,
            record.partition,
            Offset::Offset(record.offset),
            Duration::ZERO,
        ) {
            Ok(()) => tracing::debug!(
                partition = record.partition,
                offset = record.offset,
                "partition rewound"
            ),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    partition = record.partition,
                    offset = record.offset,
                    "cannot seek, replaying record locally"
                );
                self.pending = Some(record.clone());
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ChatError> {
        if self.acked.is_empty() {
            return Ok(());
        }

        let list = self.acked_offsets()?;
        let consumer = Arc::clone(&self.consumer);
        tokio::task::spawn_blocking(move || consumer.commit(&list, CommitMode::Sync))
            .await
            .map_err(|e| ChatError::transient("kafka commit task failed", e))?
            .map_err(|e| ChatError::transient("cannot commit kafka offsets", e))?;

        tracing::info!(partitions = self.acked.len(), "kafka offsets committed");
        Ok(())
    }
}
