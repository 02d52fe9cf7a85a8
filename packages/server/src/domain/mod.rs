//! Domain layer for the chat relay.
//!
//! This module contains the message model, its validation rules and the
//! capability traits the outer layers implement. It knows nothing about
//! WebSocket, Kafka, PostgreSQL or Redis.

pub mod connection;
pub mod entity;
pub mod error;
pub mod repository;
pub mod value_object;

pub use connection::ConnectionId;
pub use entity::{ChatMessage, NOTICE_USERNAME};
pub use error::{BoxError, ChatError, ValidationError};
pub use repository::{
    BroadcastReport, BrokerRecord, MessageBroadcaster, MessageCache, MessagePublisher,
    MessageStore, RecordSource,
};
pub use value_object::{MessageText, USERNAME_MIN_LEN, Username};

#[cfg(test)]
pub use repository::{
    MockMessageBroadcaster, MockMessageCache, MockMessagePublisher, MockMessageStore,
};
