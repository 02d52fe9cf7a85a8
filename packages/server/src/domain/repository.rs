//! Capability traits implemented by the infrastructure layer.
//!
//! UseCase 層はこれらの trait にのみ依存し、Kafka / PostgreSQL / Redis の
//! 具体的な実装には依存しません（依存性の逆転）。テストではインメモリ実装や
//! mockall のモックに差し替えます。

use async_trait::async_trait;

use super::{entity::ChatMessage, error::ChatError};

/// Hands accepted messages to the broker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Enqueue `message` for asynchronous delivery.
    ///
    /// Returns once the broker client accepted the record into its send
    /// queue, not once the record is durably committed.
    async fn publish(&self, message: &ChatMessage) -> Result<(), ChatError>;
}

/// System of record for messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: &ChatMessage) -> Result<(), ChatError>;

    /// The `limit` most recent messages, oldest first.
    async fn select_recent(&self, limit: usize) -> Result<Vec<ChatMessage>, ChatError>;
}

/// Best-effort recent-history accelerator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageCache: Send + Sync {
    /// Push an encoded message at the head of the recent list.
    async fn push_recent(&self, payload: &[u8]) -> Result<(), ChatError>;

    /// The `count` newest encoded messages, newest first.
    ///
    /// An absent key yields an empty list, not an error.
    async fn range_recent(&self, count: usize) -> Result<Vec<Vec<u8>>, ChatError>;
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Delivers a payload to every live connection.
#[cfg_attr(test, mockall::automock)]
pub trait MessageBroadcaster: Send + Sync {
    fn broadcast(&self, payload: &str) -> BroadcastReport;
}

/// One record pulled from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// Consumer-group subscription with explicit acknowledgment.
#[async_trait]
pub trait RecordSource: Send {
    /// Wait for the next record. `Ok(None)` means the subscription ended.
    async fn next_record(&mut self) -> Result<Option<BrokerRecord>, ChatError>;

    /// Acknowledge `record`; it will not be redelivered to this group.
    fn commit(&mut self, record: &BrokerRecord) -> Result<(), ChatError>;

    /// Deliver `record` again on the next `next_record` call.
    fn rewind(&mut self, record: &BrokerRecord) -> Result<(), ChatError>;

    /// Make every acknowledgment durable before the source is dropped.
    async fn flush(&mut self) -> Result<(), ChatError>;
}
