//! UseCase: 履歴読み込み処理
//!
//! キャッシュを優先し、読めなかった場合は永続ストレージにフォールバックします。
//! 1 回の呼び出しでキャッシュとストレージの結果を混ぜることはありません。

use std::sync::Arc;

use crate::{
    domain::{ChatError, ChatMessage, MessageCache, MessageStore},
    infrastructure::dto::websocket::MessagePayload,
};

/// 履歴読み込みのユースケース
pub struct LoadHistoryUseCase {
    cache: Arc<dyn MessageCache>,
    store: Arc<dyn MessageStore>,
}

impl LoadHistoryUseCase {
    /// 新しい LoadHistoryUseCase を作成
    pub fn new(cache: Arc<dyn MessageCache>, store: Arc<dyn MessageStore>) -> Self {
        Self { cache, store }
    }

    /// 直近 `count` 件のメッセージを古い順に返す
    ///
    /// # Errors
    ///
    /// * `ChatError::NotFound` - キャッシュにもストレージにもメッセージがない
    /// * `ChatError::TransientIo` - キャッシュもストレージも読めなかった
    pub async fn load_recent(&self, count: usize) -> Result<Vec<ChatMessage>, ChatError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        match self.load_from_cache(count).await {
            Ok(messages) => return Ok(messages),
            Err(e) => tracing::debug!(error = %e, "cache miss, falling back to storage"),
        }

        let messages = self.store.select_recent(count).await?;
        if messages.is_empty() {
            return Err(ChatError::NotFound);
        }
        Ok(messages)
    }

    async fn load_from_cache(&self, count: usize) -> Result<Vec<ChatMessage>, ChatError> {
        let entries = self.cache.range_recent(count).await?;
        if entries.is_empty() {
            return Err(ChatError::NotFound);
        }

        // The cache lists newest first.
        entries
            .iter()
            .rev()
            .map(|entry| MessagePayload::restore_message(entry))
            .collect()
    }
}
