//! Trace span domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One span of a distributed trace
///
/// A span with an empty `parent_span_id` is a root span (transaction) and
/// counts against the owning project's monthly event quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSpan {
    pub id: String,
    pub project_id: String,
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_span_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub op: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub start_timestamp: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
}

impl TraceSpan {
    pub fn new(project_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            trace_id: String::new(),
            span_id: String::new(),
            parent_span_id: String::new(),
            name: String::new(),
            op: String::new(),
            description: String::new(),
            start_timestamp: now,
            timestamp: now,
            status: String::new(),
            data: "{}".to_string(),
        }
    }

    /// Root spans have no parent and represent whole transactions
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_empty()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.timestamp - self.start_timestamp).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_root_detection() {
        let mut span = TraceSpan::new("p1");
        assert!(span.is_root());

        span.parent_span_id = "abcd".to_string();
        assert!(!span.is_root());
    }

    #[test]
    fn test_duration() {
        let mut span = TraceSpan::new("p1");
        span.start_timestamp = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        span.timestamp = Utc.timestamp_opt(1_700_000_001, 500_000_000).unwrap();

        assert_eq!(span.duration_ms(), 1500);
    }

    #[test]
    fn test_empty_fields_skipped_in_json() {
        let span = TraceSpan::new("p1");
        let json = serde_json::to_string(&span).unwrap();

        assert!(!json.contains("parent_span_id"));
        assert!(!json.contains("\"op\""));
        assert!(json.contains("\"trace_id\""));
    }
}
