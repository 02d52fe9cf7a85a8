//! Value Objects for domain models.
//!
//! Value Objects are immutable and compared by value. Construction is the
//! only place their rules are checked.

use std::fmt;

use super::error::ValidationError;

/// Minimum length of a username, in UTF-8 bytes.
pub const USERNAME_MIN_LEN: usize = 3;

/// Name a message is posted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Create a new Username.
    ///
    /// Length is counted in UTF-8 bytes, so `"ゆき"` (six bytes) passes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UsernameTooShort` for fewer than
    /// [`USERNAME_MIN_LEN`] bytes.
    pub fn new(name: String) -> Result<Self, ValidationError> {
        let len = name.len();
        if len < USERNAME_MIN_LEN {
            return Err(ValidationError::UsernameTooShort {
                min: USERNAME_MIN_LEN,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    /// Rebuild a username that was validated before it was persisted.
    pub(crate) fn restore(name: String) -> Self {
        Self(name)
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text body of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText(String);

impl MessageText {
    /// Create a new MessageText.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyText` if `text` is empty.
    pub fn new(text: String) -> Result<Self, ValidationError> {
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(Self(text))
    }

    pub(crate) fn restore(text: String) -> Self {
        Self(text)
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageText {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_new_success() {
        // テスト項目: 3 文字以上のユーザー名を作成できる
        // given (前提条件):
        let name = "ale".to_string();

        // when (操作):
        let result = Username::new(name);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "ale");
    }

    #[test]
    fn test_username_too_short_fails() {
        // テスト項目: 2 文字のユーザー名は作成できない
        // given (前提条件):
        let name = "al".to_string();

        // when (操作):
        let result = Username::new(name);

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValidationError::UsernameTooShort { min: 3, actual: 2 }
        );
    }

    #[test]
    fn test_username_counts_bytes() {
        // テスト項目: 長さは UTF-8 のバイト数で数える
        // given (前提条件): 2 文字だが 6 バイト
        let name = "ゆき".to_string();

        // when (操作):
        let result = Username::new(name);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "ゆき");
        assert_eq!(
            Username::new("é".to_string()).unwrap_err(),
            ValidationError::UsernameTooShort { min: 3, actual: 2 }
        );
    }

    #[test]
    fn test_message_text_new_success() {
        // テスト項目: 空でないメッセージ本文を作成できる
        let result = MessageText::try_from("hi".to_string());

        assert_eq!(result.unwrap().as_str(), "hi");
    }

    #[test]
    fn test_message_text_empty_fails() {
        // テスト項目: 空のメッセージ本文は作成できない
        let result = MessageText::new(String::new());

        assert_eq!(result.unwrap_err(), ValidationError::EmptyText);
    }
}
