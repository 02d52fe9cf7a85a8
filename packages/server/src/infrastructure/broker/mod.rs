//! Message broker adapters.
//!
//! `kafka` talks to a real cluster; `inmemory` keeps the same
//! publish/subscribe and commit semantics inside the process.

pub mod inmemory;
pub mod kafka;
pub mod kafka_consumer;
pub mod retry;

pub use inmemory::{InMemoryBroker, InMemoryRecordSource};
pub use kafka::{KafkaMessagePublisher, KafkaSettings};
pub use kafka_consumer::KafkaRecordSource;
pub use retry::RetryPolicy;
