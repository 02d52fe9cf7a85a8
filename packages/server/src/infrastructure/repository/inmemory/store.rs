//! InMemory MessageStore 実装
//!
//! Vec を挿入順のテーブルとして使用します。

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{ChatError, ChatMessage, MessageStore};

/// インメモリ MessageStore 実装
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    /// 挿入順に並んだメッセージ（添字が挿入シーケンス）
    rows: Mutex<Vec<ChatMessage>>,
}

impl InMemoryMessageStore {
    /// 新しい InMemoryMessageStore を作成
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 全行のコピー（挿入順）
    pub fn rows(&self) -> Vec<ChatMessage> {
        self.lock().clone()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: &ChatMessage) -> Result<(), ChatError> {
        self.lock().push(message.clone());
        Ok(())
    }

    async fn select_recent(&self, limit: usize) -> Result<Vec<ChatMessage>, ChatError> {
        let rows = self.lock();
        let start = rows.len().saturating_sub(limit);
        Ok(rows[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> ChatMessage {
        ChatMessage::restore("ale".to_string(), text.to_string())
    }

    #[tokio::test]
    async fn test_select_recent_returns_last_rows_oldest_first() {
        // テスト項目: 直近 n 件が挿入順で返される
        // given (前提条件): m1..m5 を順に挿入
        let store = InMemoryMessageStore::new();
        for i in 1..=5 {
            store.insert(&message(&format!("m{i}"))).await.unwrap();
        }

        // when (操作):
        let recent = store.select_recent(3).await.unwrap();

        // then (期待する結果):
        assert_eq!(recent, vec![message("m3"), message("m4"), message("m5")]);
    }

    #[tokio::test]
    async fn test_select_recent_with_large_limit() {
        // テスト項目: 件数より大きい limit でも全件が返される
        let store = InMemoryMessageStore::new();
        store.insert(&message("only")).await.unwrap();

        let recent = store.select_recent(10).await.unwrap();

        assert_eq!(recent, vec![message("only")]);
    }
}
