//! Time helpers.

use chrono::{SecondsFormat, Utc};

/// Current time as an RFC 3339 string in UTC with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_rfc3339_is_utc_with_millis() {
        // テスト項目: RFC 3339 形式 (UTC, ミリ秒) で現在時刻を返す
        // when (操作):
        let now = now_rfc3339();

        // then (期待する結果):
        assert!(now.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
