//! PostgreSQL MessageStore 実装
//!
//! `messages` テーブルを永続ストレージとして使用します。
//! `id` の BIGSERIAL が挿入シーケンスとなり、読み出し時の並び順にのみ使われます。

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::domain::{ChatError, ChatMessage, MessageStore};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS messages (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL,
    data TEXT NOT NULL
)";

const INSERT_MESSAGE: &str = "INSERT INTO messages (username, data) VALUES ($1, $2)";

const SELECT_RECENT: &str = "SELECT username, data FROM (
    SELECT id, username, data FROM messages ORDER BY id DESC LIMIT $1
) recent ORDER BY id";

/// PostgreSQL MessageStore 実装
#[derive(Debug, Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    /// プールを作成し、テーブルがなければ作成する
    pub async fn connect(database_url: &str) -> Result<Self, ChatError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| ChatError::fatal_startup("cannot connect to postgres", e))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        tracing::info!("postgres message store ready");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), ChatError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| ChatError::fatal_startup("cannot create messages table", e))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn insert(&self, message: &ChatMessage) -> Result<(), ChatError> {
        sqlx::query(INSERT_MESSAGE)
            .bind(message.username().as_str())
            .bind(message.text().as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| ChatError::transient("cannot save message", e))?;
        Ok(())
    }

    async fn select_recent(&self, limit: usize) -> Result<Vec<ChatMessage>, ChatError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, (String, String)>(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ChatError::transient("cannot load messages", e))?;

        Ok(rows
            .into_iter()
            .map(|(username, text)| ChatMessage::restore(username, text))
            .collect())
    }
}
