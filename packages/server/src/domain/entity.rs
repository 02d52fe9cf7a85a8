//! Core domain model: the chat message.

use super::value_object::{MessageText, Username};
use super::error::ValidationError;

/// Username reserved for notices the server sends back to a client whose
/// message was rejected.
pub const NOTICE_USERNAME: &str = "WRONG MESSAGE ERROR";

/// A validated chat message.
///
/// Fields are private so a message cannot change after validation; it is only
/// ever copied or serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    username: Username,
    text: MessageText,
}

impl ChatMessage {
    /// Create a new chat message from validated parts
    pub fn new(username: Username, text: MessageText) -> Self {
        Self { username, text }
    }

    /// Rebuild a message read back from storage, cache or the broker.
    ///
    /// Persisted messages were validated on the way in and are not checked
    /// again.
    pub fn restore(username: String, text: String) -> Self {
        Self {
            username: Username::restore(username),
            text: MessageText::restore(text),
        }
    }

    /// Notice addressed to a client whose payload failed validation
    pub fn notice(reason: &ValidationError) -> Self {
        Self::restore(NOTICE_USERNAME.to_string(), reason.to_string())
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn text(&self) -> &MessageText {
        &self.text
    }

    pub fn is_notice(&self) -> bool {
        self.username.as_str() == NOTICE_USERNAME
    }
}
