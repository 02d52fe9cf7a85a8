//! Redis MessageCache 実装
//!
//! 1 つのリストキーに新しいメッセージを LPUSH し、LRANGE で読み出します。
//! 接続は最初のコマンド実行時に確立し、失敗した場合は次のコマンドで再試行します。

use async_trait::async_trait;
use redis::{
    Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::OnceCell;

use crate::domain::{ChatError, MessageCache};

/// Connection attempts per command while redis is unreachable.
const CONNECT_RETRIES: usize = 1;

/// Redis MessageCache 実装
pub struct RedisMessageCache {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    key: String,
}

impl RedisMessageCache {
    /// URL を検証してキャッシュを作成する（接続はまだ行わない）
    ///
    /// # Errors
    ///
    /// * `ChatError::FatalStartup` - URL が redis の接続先として解釈できない
    pub fn new(url: &str, key: impl Into<String>) -> Result<Self, ChatError> {
        let client =
            Client::open(url).map_err(|e| ChatError::fatal_startup("invalid redis url", e))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            key: key.into(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, ChatError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new().set_number_of_retries(CONNECT_RETRIES);
                let connection = self
                    .client
                    .get_connection_manager_with_config(config)
                    .await
                    .map_err(|e| ChatError::transient("cannot connect to redis", e))?;
                tracing::info!("redis message cache connected");
                Ok::<_, ChatError>(connection)
            })
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl MessageCache for RedisMessageCache {
    async fn push_recent(&self, payload: &[u8]) -> Result<(), ChatError> {
        let mut connection = self.connection().await?;
        redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(payload)
            .query_async::<()>(&mut connection)
            .await
            .map_err(|e| ChatError::transient("cannot push message to redis", e))?;
        Ok(())
    }

    async fn range_recent(&self, count: usize) -> Result<Vec<Vec<u8>>, ChatError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let stop = isize::try_from(count - 1).unwrap_or(isize::MAX);
        let mut connection = self.connection().await?;
        redis::cmd("LRANGE")
            .arg(&self.key)
            .arg(0)
            .arg(stop)
            .query_async::<Vec<Vec<u8>>>(&mut connection)
            .await
            .map_err(|e| ChatError::transient("cannot load messages from redis", e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{ChatMessage, MessageStore},
        infrastructure::repository::InMemoryMessageStore,
        usecase::{LoadHistoryUseCase, PersistMessageUseCase},
    };

    // Nothing listens on port 1, so every connection attempt is refused.
    const UNREACHABLE: &str = "redis://127.0.0.1:1/0";

    #[test]
    fn test_new_does_not_connect() {
        // テスト項目: redis に到達できなくてもキャッシュは作成できる
        // when (操作):
        let result = RedisMessageCache::new(UNREACHABLE, "chat:messages");

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_url_is_fatal() {
        // テスト項目: redis として解釈できない URL は起動時エラーになる
        let result = RedisMessageCache::new("not a url", "chat:messages");

        assert!(matches!(result, Err(ChatError::FatalStartup { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_transient() {
        // テスト項目: redis に到達できない場合、各操作は TransientIo を返す
        // given (前提条件):
        let cache = RedisMessageCache::new(UNREACHABLE, "chat:messages").unwrap();

        // when (操作):
        let pushed = cache.push_recent(br#"{"username":"ale","message":"hi"}"#).await;
        let ranged = cache.range_recent(3).await;

        // then (期待する結果):
        assert!(pushed.unwrap_err().is_transient());
        assert!(ranged.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_history_and_persistence_survive_unreachable_redis() {
        // テスト項目: redis に到達できなくても、レコードはストレージに保存され、履歴はストレージから読める
        // given (前提条件):
        let cache = Arc::new(RedisMessageCache::new(UNREACHABLE, "chat:messages").unwrap());
        let store = Arc::new(InMemoryMessageStore::new());
        let persist = PersistMessageUseCase::new(store.clone(), cache.clone());
        let history = LoadHistoryUseCase::new(cache, store.clone());

        // when (操作):
        let records: [&[u8]; 2] = [
            br#"{"username":"ale","message":"m1"}"#,
            br#"{"username":"bob","message":"m2"}"#,
        ];
        for record in records {
            let cache_write = persist.execute(record).await.unwrap();
            cache_write.await.unwrap();
        }
        let messages = history.load_recent(5).await.unwrap();

        // then (期待する結果):
        assert_eq!(store.select_recent(5).await.unwrap().len(), 2);
        let expected = vec![
            ChatMessage::restore("ale".into(), "m1".into()),
            ChatMessage::restore("bob".into(), "m2".into()),
        ];
        assert_eq!(messages, expected);
    }
}
