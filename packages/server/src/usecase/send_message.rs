//! UseCase: メッセージ送信処理
//!
//! 受信したペイロードを検証し、ブローカーへ publish したうえで
//! 全接続へブロードキャストします。永続化の完了は待ちません。

use std::sync::Arc;

use crate::domain::{BroadcastReport, ChatError, MessageBroadcaster, MessagePublisher};

use super::validate_message::validate_message;

/// Whether fan-out waits for the publisher to accept the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BroadcastOrdering {
    /// Publish first; a message the broker refused is not broadcast.
    #[default]
    PublishFirst,
    /// Broadcast first; a publish failure is only logged.
    BroadcastFirst,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    publisher: Arc<dyn MessagePublisher>,
    broadcaster: Arc<dyn MessageBroadcaster>,
    ordering: BroadcastOrdering,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(
        publisher: Arc<dyn MessagePublisher>,
        broadcaster: Arc<dyn MessageBroadcaster>,
        ordering: BroadcastOrdering,
    ) -> Self {
        Self {
            publisher,
            broadcaster,
            ordering,
        }
    }

    /// メッセージ送信を実行
    ///
    /// The raw payload is broadcast byte-for-byte; the publisher receives the
    /// validated message.
    ///
    /// # Errors
    ///
    /// * `ChatError::Validation` - ペイロードが検証に失敗した（送信元にのみ通知する）
    /// * `ChatError::TransientIo` - ブローカーが受け付けなかった（`PublishFirst` のみ）
    pub async fn execute(&self, raw: &str) -> Result<BroadcastReport, ChatError> {
        let message = validate_message(raw.as_bytes())?;

        match self.ordering {
            BroadcastOrdering::PublishFirst => {
                self.publisher.publish(&message).await?;
                Ok(self.broadcaster.broadcast(raw))
            }
            BroadcastOrdering::BroadcastFirst => {
                let report = self.broadcaster.broadcast(raw);
                if let Err(e) = self.publisher.publish(&message).await {
                    tracing::error!(error = %e, "cannot publish message after broadcast");
                }
                Ok(report)
            }
        }
    }
}
