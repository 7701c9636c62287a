//! Watermark type.
//!
//! A watermark is the modification timestamp of the last record that was
//! durably written to the search index for one entity type.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Seconds from the Unix epoch to `0001-01-01T00:00:00Z`.
const EARLIEST_TIMESTAMP_SECS: i64 = -62_135_596_800;

/// Error returned when a stored watermark cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid watermark '{value}': {reason}")]
pub struct WatermarkParseError {
    pub value: String,
    pub reason: String,
}

/// Persisted sync cursor for one entity type.
///
/// Ordered by timestamp. Serialized as RFC 3339 in UTC with microsecond
/// precision, which is what Postgres `timestamptz` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// The sentinel used before the first successful sync.
    ///
    /// `0001-01-01T00:00:00Z` is the earliest instant both chrono and
    /// Postgres `timestamptz` can represent without era suffixes.
    pub fn earliest() -> Self {
        Self(
            DateTime::from_timestamp(EARLIEST_TIMESTAMP_SECS, 0)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        )
    }

    /// Wrap a timestamp.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp)
    }

    /// The wrapped timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parse a stored watermark.
    ///
    /// Accepts RFC 3339 and the space separated `YYYY-MM-DD HH:MM:SS[.f][+HH[:MM]]`
    /// form. Values without an offset are taken as UTC.
    pub fn parse(value: &str) -> Result<Self, WatermarkParseError> {
        let trimmed = value.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(parsed.with_timezone(&Utc)));
        }
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z") {
            return Ok(Self(parsed.with_timezone(&Utc)));
        }

        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| Self(naive.and_utc()))
            .map_err(|e| WatermarkParseError {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::earliest()
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp)
    }
}

impl FromStr for Watermark {
    type Err = WatermarkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_earliest_is_year_one() {
        assert_eq!(
            Watermark::earliest().to_string(),
            "0001-01-01T00:00:00.000000Z"
        );
    }

    #[test]
    fn test_display_parses_back() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap()
            + chrono::Duration::microseconds(123_456);
        let watermark = Watermark::new(ts);

        let text = watermark.to_string();
        assert_eq!(text, "2024-03-09T12:30:05.123456Z");
        assert_eq!(Watermark::parse(&text).unwrap(), watermark);
    }

    #[test]
    fn test_parse_space_separated_with_offset() {
        let parsed = Watermark::parse("2021-06-16 20:14:09.221855+00:00").unwrap();
        let expected = Utc.with_ymd_and_hms(2021, 6, 16, 20, 14, 9).unwrap()
            + chrono::Duration::microseconds(221_855);
        assert_eq!(parsed.timestamp(), expected);

        let short_offset = Watermark::parse("2021-06-16 23:14:09+03").unwrap();
        assert_eq!(
            short_offset.timestamp(),
            Utc.with_ymd_and_hms(2021, 6, 16, 20, 14, 9).unwrap()
        );
    }

    #[test]
    fn test_parse_naive_as_utc() {
        let parsed = Watermark::parse("0001-01-01 00:00:00").unwrap();
        assert_eq!(parsed, Watermark::earliest());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Watermark::parse("yesterday").unwrap_err();
        assert_eq!(err.value, "yesterday");
    }

    #[test]
    fn test_ordering_follows_time() {
        let early = Watermark::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let late = Watermark::new(Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap());
        assert!(Watermark::earliest() < early);
        assert!(early < late);
    }
}
