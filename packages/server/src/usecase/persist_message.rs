//! UseCase: メッセージ永続化処理
//!
//! ブローカーから受け取ったレコードをストレージに書き込み、
//! 成功した場合のみキャッシュへバックグラウンドで書き込みます。

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    domain::{ChatError, ChatMessage, MessageCache, MessageStore},
    infrastructure::dto::websocket::MessagePayload,
};

/// メッセージ永続化のユースケース
pub struct PersistMessageUseCase {
    store: Arc<dyn MessageStore>,
    cache: Arc<dyn MessageCache>,
}

impl PersistMessageUseCase {
    /// 新しい PersistMessageUseCase を作成
    pub fn new(store: Arc<dyn MessageStore>, cache: Arc<dyn MessageCache>) -> Self {
        Self { store, cache }
    }

    /// レコード 1 件を永続化する
    ///
    /// Returns once the storage write succeeded. The cache write runs on a
    /// detached task whose handle is returned; its failure is only logged.
    ///
    /// # Errors
    ///
    /// * `ChatError::Codec` - レコードがメッセージ形式ではない
    /// * `ChatError::TransientIo` - ストレージへの書き込みに失敗した
    pub async fn execute(&self, payload: &[u8]) -> Result<JoinHandle<()>, ChatError> {
        let message = MessagePayload::restore_message(payload)?;
        self.store.insert(&message).await?;

        let cache = Arc::clone(&self.cache);
        Ok(tokio::spawn(async move {
            if let Err(e) = push_to_cache(cache.as_ref(), &message).await {
                tracing::warn!(error = %e, "cannot push message to cache");
            }
        }))
    }
}

async fn push_to_cache(cache: &dyn MessageCache, message: &ChatMessage) -> Result<(), ChatError> {
    let encoded = MessagePayload::from(message).encode()?;
    cache.push_recent(encoded.as_bytes()).await
}
