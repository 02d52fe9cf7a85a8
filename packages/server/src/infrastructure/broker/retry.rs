//! Fixed-interval retry used while the broker may still be starting.

use std::{future::Future, time::Duration};

/// Attempt count and pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 15,
            interval: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// Returns the last error when every attempt failed. At least one
    /// attempt is always made.
    pub async fn retry<T, E, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        error = %e,
                        "{what} failed, retrying in {:?}",
                        self.interval
                    );
                    tokio::time::sleep(self.interval).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_default_policy() {
        // テスト項目: 既定値は 15 回・200ms 間隔
        let policy = RetryPolicy::default();

        assert_eq!(policy.attempts, 15);
        assert_eq!(policy.interval, Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        // テスト項目: 成功するまで再試行する
        // given (前提条件): 3 回目で成功する操作
        let calls = AtomicU32::new(0);
        let counter = &calls;

        // when (操作):
        let result: Result<u32, String> = quick(5)
            .retry("connect", move || async move {
                let calls = counter;
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("attempt {n}")) } else { Ok(n) }
            })
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        // テスト項目: 回数を使い切ると最後のエラーを返す
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), String> = quick(4)
            .retry("connect", move || async move {
                let calls = counter;
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {n}"))
            })
            .await;

        assert_eq!(result, Err("attempt 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
