//! Domain layer error definitions.

use thiserror::Error;

/// Boxed cause carried by infrastructure failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Reasons an inbound payload is rejected.
///
/// The `Display` text is what the offending client sees in its notice
/// message, so it must not leak anything but the rule that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Payload is not a `{"username": .., "message": ..}` JSON object
    #[error("{0}")]
    Decode(String),

    /// Message text is empty
    #[error("message text must be non-empty")]
    EmptyText,

    /// Username shorter than the minimum
    #[error("username length must be at least {min} characters")]
    UsernameTooShort { min: usize, actual: usize },
}

/// Closed set of failures crossing layer boundaries.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Malformed or policy-violating inbound payload
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// History requested but neither cache nor storage holds any message
    #[error("no messages found")]
    NotFound,

    /// Storage, cache or broker round trip failed
    #[error("{context}: {source}")]
    TransientIo {
        context: String,
        #[source]
        source: BoxError,
    },

    /// A broker record or cache entry does not have the message shape
    #[error("{context}: {source}")]
    Codec {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Broker or consumer group unavailable after the bounded retries
    #[error("{context}: {source}")]
    FatalStartup {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl ChatError {
    pub fn transient(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::TransientIo {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn codec(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Codec {
            context: context.into(),
            source,
        }
    }

    pub fn fatal_startup(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::FatalStartup {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        // テスト項目: クライアントに返す文言が固定されている
        assert_eq!(
            ValidationError::EmptyText.to_string(),
            "message text must be non-empty"
        );
        assert_eq!(
            ValidationError::UsernameTooShort { min: 3, actual: 2 }.to_string(),
            "username length must be at least 3 characters"
        );
    }

    #[test]
    fn test_transient_error_keeps_cause() {
        // テスト項目: TransientIo は原因を保持し、表示に含める
        // given (前提条件):
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");

        // when (操作):
        let error = ChatError::transient("cannot insert message", cause);

        // then (期待する結果):
        assert!(error.is_transient());
        assert_eq!(error.to_string(), "cannot insert message: refused");
        assert!(std::error::Error::source(&error).is_some());
    }
}
