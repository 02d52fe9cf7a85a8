//! Message DTO shared by WebSocket frames, broker records and cache entries.
//!
//! All three encodings use the same JSON object so a record can move between
//! them without translation.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatError, ChatMessage};

/// `{"username": "...", "message": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub username: String,
    #[serde(rename = "message")]
    pub text: String,
}

impl MessagePayload {
    /// Parse a payload from raw bytes.
    pub fn decode(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Canonical JSON encoding.
    pub fn encode(&self) -> Result<String, ChatError> {
        serde_json::to_string(self).map_err(|e| ChatError::codec("cannot encode message", e))
    }

    /// Rebuild a persisted message from its encoded form.
    pub fn restore_message(raw: &[u8]) -> Result<ChatMessage, ChatError> {
        let payload =
            Self::decode(raw).map_err(|e| ChatError::codec("cannot decode message", e))?;
        Ok(payload.into())
    }
}

impl From<&ChatMessage> for MessagePayload {
    fn from(message: &ChatMessage) -> Self {
        Self {
            username: message.username().as_str().to_string(),
            text: message.text().as_str().to_string(),
        }
    }
}

impl From<MessagePayload> for ChatMessage {
    fn from(payload: MessagePayload) -> Self {
        ChatMessage::restore(payload.username, payload.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_message_field_name() {
        // テスト項目: 本文は "message" フィールドとしてエンコードされる
        // given (前提条件):
        let message = ChatMessage::restore("ale".to_string(), "hi".to_string());

        // when (操作):
        let json = MessagePayload::from(&message).encode().unwrap();

        // then (期待する結果):
        assert_eq!(json, r#"{"username":"ale","message":"hi"}"#);
    }

    #[test]
    fn test_decode_requires_both_fields() {
        // テスト項目: 必須フィールドが欠けているとデコードに失敗する
        assert!(MessagePayload::decode(br#"{"username":"ale"}"#).is_err());
        assert!(MessagePayload::decode(br#"{"message":"hi"}"#).is_err());
    }

    #[test]
    fn test_restore_message_rejects_foreign_shape() {
        // テスト項目: メッセージ形式でないレコードは Codec エラーになる
        let result = MessagePayload::restore_message(b"[1,2,3]");

        assert!(matches!(result, Err(ChatError::Codec { .. })));
    }
}
