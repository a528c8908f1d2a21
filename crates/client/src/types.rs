//! Shared value types: application field data and engine timestamps.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application data attached to a workitem or launch item.
///
/// Keys are field names; values keep their JSON shape (string, number, bool,
/// null, array, object) so data survives a fetch/update round trip untouched.
pub type Fields = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp reported by the engine.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parses a timestamp string as the engine renders it.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS UTC` and
    /// `YYYY-MM-DD HH:MM:SS +hhmm`. Returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S UTC")
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_engine_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2010, 3, 4, 10, 11, 12).unwrap();

        for raw in [
            "2010-03-04T10:11:12Z",
            "2010-03-04 10:11:12 UTC",
            "2010-03-04 19:11:12 +0900",
        ] {
            assert_eq!(
                Timestamp::parse(raw).map(Timestamp::as_datetime),
                Some(expected),
                "{raw}"
            );
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_none());
        assert!(Timestamp::parse("").is_none());
    }
}
