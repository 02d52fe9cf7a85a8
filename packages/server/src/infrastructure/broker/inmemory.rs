//! In-process broker with consumer-group offsets.
//!
//! Keeps one append-only log for the chat topic and one committed offset per
//! group, which is enough to reproduce at-least-once redelivery without a
//! cluster.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    domain::{BrokerRecord, ChatError, ChatMessage, MessagePublisher, RecordSource},
    infrastructure::dto::websocket::MessagePayload,
};

#[derive(Debug, Default)]
struct Log {
    records: Vec<Vec<u8>>,
    committed: HashMap<String, i64>,
    closed: bool,
}

/// Shared log; publishers append, `subscribe` hands out group members.
#[derive(Debug)]
pub struct InMemoryBroker {
    topic: String,
    log: Mutex<Log>,
    appended: Notify,
}

impl InMemoryBroker {
    pub fn new(topic: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            topic: topic.into(),
            log: Mutex::new(Log::default()),
            appended: Notify::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an already encoded record.
    pub fn append(&self, payload: Vec<u8>) -> Result<i64, ChatError> {
        let offset = {
            let mut log = self.lock();
            if log.closed {
                return Err(ChatError::transient(
                    "cannot append record",
                    "broker is closed",
                ));
            }
            log.records.push(payload);
            log.records.len() as i64 - 1
        };
        self.appended.notify_waiters();
        Ok(offset)
    }

    /// Join `group`, resuming after its last committed offset.
    pub fn subscribe(self: &Arc<Self>, group: impl Into<String>) -> InMemoryRecordSource {
        let group = group.into();
        let next_offset = self.committed_offset(&group).unwrap_or(0);
        InMemoryRecordSource {
            broker: Arc::clone(self),
            group,
            next_offset,
        }
    }

    /// Offset of the next record `group` would read after a restart.
    pub fn committed_offset(&self, group: &str) -> Option<i64> {
        self.lock().committed.get(group).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// End every subscription once it has read the remaining records.
    pub fn close(&self) {
        self.lock().closed = true;
        self.appended.notify_waiters();
    }

    fn commit(&self, group: &str, next_offset: i64) {
        let mut log = self.lock();
        let committed = log.committed.entry(group.to_string()).or_insert(0);
        *committed = (*committed).max(next_offset);
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBroker {
    async fn publish(&self, message: &ChatMessage) -> Result<(), ChatError> {
        let encoded = MessagePayload::from(message).encode()?;
        self.append(encoded.into_bytes())?;
        Ok(())
    }
}

/// One consumer-group member reading the in-memory log.
#[derive(Debug)]
pub struct InMemoryRecordSource {
    broker: Arc<InMemoryBroker>,
    group: String,
    next_offset: i64,
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn next_record(&mut self) -> Result<Option<BrokerRecord>, ChatError> {
        loop {
            // Registered before the check so an append in between still wakes us.
            let appended = self.broker.appended.notified();
            {
                let log = self.broker.lock();
                if let Some(payload) = usize::try_from(self.next_offset)
                    .ok()
                    .and_then(|index| log.records.get(index))
                {
                    let record = BrokerRecord {
                        topic: self.broker.topic.clone(),
                        partition: 0,
                        offset: self.next_offset,
                        payload: payload.clone(),
                    };
                    self.next_offset += 1;
                    return Ok(Some(record));
                }
                if log.closed {
                    return Ok(None);
                }
            }
            appended.await;
        }
    }

    fn commit(&mut self, record: &BrokerRecord) -> Result<(), ChatError> {
        self.broker.commit(&self.group, record.offset + 1);
        Ok(())
    }

    fn rewind(&mut self, record: &BrokerRecord) -> Result<(), ChatError> {
        self.next_offset = record.offset;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ChatError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> ChatMessage {
        ChatMessage::restore("ale".to_string(), text.to_string())
    }

    #[tokio::test]
    async fn test_subscriber_reads_published_records_in_order() {
        // テスト項目: publish したレコードが順番に読み出せる
        // given (前提条件):
        let broker = InMemoryBroker::new("chat-messages");
        broker.publish(&message("one")).await.unwrap();
        broker.publish(&message("two")).await.unwrap();
        let mut source = broker.subscribe("storage");

        // when (操作):
        let first = source.next_record().await.unwrap().unwrap();
        let second = source.next_record().await.unwrap().unwrap();

        // then (期待する結果):
        assert_eq!((first.offset, second.offset), (0, 1));
        assert_eq!(first.topic, "chat-messages");
        assert_eq!(first.payload, br#"{"username":"ale","message":"one"}"#.to_vec());
    }

    #[tokio::test]
    async fn test_waiting_subscriber_is_woken_by_publish() {
        // テスト項目: レコード待ちのサブスクライバーが publish で起こされる
        let broker = InMemoryBroker::new("chat-messages");
        let mut source = broker.subscribe("storage");
        let reader = tokio::spawn(async move { source.next_record().await });

        tokio::task::yield_now().await;
        broker.publish(&message("late")).await.unwrap();

        let record = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(record.offset, 0);
    }

    #[tokio::test]
    async fn test_uncommitted_records_are_redelivered_to_new_member() {
        // テスト項目: コミットされていないレコードは再購読時に再配信される
        // given (前提条件): 1 件目のみコミット済み
        let broker = InMemoryBroker::new("chat-messages");
        broker.publish(&message("one")).await.unwrap();
        broker.publish(&message("two")).await.unwrap();
        let mut source = broker.subscribe("storage");
        let first = source.next_record().await.unwrap().unwrap();
        source.commit(&first).unwrap();
        source.next_record().await.unwrap().unwrap();
        drop(source);

        // when (操作):
        let mut restarted = broker.subscribe("storage");
        let record = restarted.next_record().await.unwrap().unwrap();

        // then (期待する結果):
        assert_eq!(record.offset, 1);
        assert_eq!(broker.committed_offset("storage"), Some(1));
    }

    #[tokio::test]
    async fn test_rewind_returns_same_record() {
        // テスト項目: rewind したレコードが次回も返される
        let broker = InMemoryBroker::new("chat-messages");
        broker.publish(&message("one")).await.unwrap();
        let mut source = broker.subscribe("storage");

        let record = source.next_record().await.unwrap().unwrap();
        source.rewind(&record).unwrap();
        let again = source.next_record().await.unwrap().unwrap();

        assert_eq!(record, again);
    }

    #[tokio::test]
    async fn test_close_ends_subscription_and_rejects_publish() {
        // テスト項目: close 後は購読が終了し、publish は失敗する
        let broker = InMemoryBroker::new("chat-messages");
        let mut source = broker.subscribe("storage");

        broker.close();

        assert!(source.next_record().await.unwrap().is_none());
        assert!(broker.publish(&message("late")).await.unwrap_err().is_transient());
    }
}
