//! Flexible timestamp decoding

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// A timestamp that may arrive as fractional epoch seconds or as a string
///
/// String forms are tried in order: RFC3339 (with or without fractional
/// seconds), `YYYY-MM-DDTHH:MM:SS.fff`, `YYYY-MM-DDTHH:MM:SS`, and
/// `YYYY-MM-DD HH:MM:SS`. Naive forms are taken as UTC. Failing every form
/// is a hard error for the item carrying the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexTimestamp(pub DateTime<Utc>);

impl FlexTimestamp {
    pub fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }

    fn from_seconds(seconds: f64) -> Option<Self> {
        let secs = seconds.trunc() as i64;
        let nanos = (seconds.fract() * 1e9).round() as u32;
        DateTime::<Utc>::from_timestamp(secs, nanos).map(FlexTimestamp)
    }

    fn from_text(s: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(FlexTimestamp(dt.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Some(FlexTimestamp(naive.and_utc()));
            }
        }
        None
    }
}

impl From<FlexTimestamp> for DateTime<Utc> {
    fn from(ts: FlexTimestamp) -> Self {
        ts.0
    }
}

impl<'de> Deserialize<'de> for FlexTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(s) => FlexTimestamp::from_seconds(s)
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", s))),
            Raw::Text(s) => FlexTimestamp::from_text(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(json: &str) -> FlexTimestamp {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_numeric_seconds() {
        let ts = parse("1700000000");
        assert_eq!(ts.0, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn test_fractional_seconds() {
        let ts = parse("1700000000.25");
        assert_eq!(ts.0.timestamp(), 1_700_000_000);
        assert_eq!(ts.0.timestamp_subsec_nanos(), 250_000_000);
    }

    #[test]
    fn test_rfc3339_with_nanos() {
        let ts = parse("\"2024-01-02T03:04:05.123456789Z\"");
        assert_eq!(ts.0.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let ts = parse("\"2024-01-02T03:04:05+02:00\"");
        assert_eq!(ts.0, Utc.with_ymd_and_hms(2024, 1, 2, 1, 4, 5).unwrap());
    }

    #[test]
    fn test_naive_with_t_separator() {
        let ts = parse("\"2024-01-02T03:04:05\"");
        assert_eq!(ts.0, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn test_naive_with_fraction() {
        let ts = parse("\"2024-01-02T03:04:05.500\"");
        assert_eq!(ts.0.timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_naive_with_space_separator() {
        let ts = parse("\"2024-01-02 03:04:05\"");
        assert_eq!(ts.0, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(serde_json::from_str::<FlexTimestamp>("\"next tuesday\"").is_err());
        assert!(serde_json::from_str::<FlexTimestamp>("true").is_err());
    }
}
