//! Inbound payload validation.
//!
//! Rules are checked in order and the first failure wins:
//! 1. the payload decodes into the message shape,
//! 2. the text is non-empty,
//! 3. the username is at least three bytes long.

use crate::{
    domain::{ChatMessage, MessageText, Username, ValidationError},
    infrastructure::dto::websocket::MessagePayload,
};

/// Validate a raw inbound frame. Pure: the same bytes always give the same
/// outcome.
pub fn validate_message(raw: &[u8]) -> Result<ChatMessage, ValidationError> {
    let payload =
        MessagePayload::decode(raw).map_err(|e| ValidationError::Decode(e.to_string()))?;
    let text = MessageText::new(payload.text)?;
    let username = Username::new(payload.username)?;
    Ok(ChatMessage::new(username, text))
}
