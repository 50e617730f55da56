//! Derived error group view
//!
//! Groups are a pure query-time derivation over stored error rows keyed by
//! fingerprint. No group row is ever materialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated view over all error events sharing a fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorGroup {
    pub fingerprint: String,
    pub message: String,
    pub level: String,
    pub status: String,
    pub project_id: String,
    pub environment: String,
    pub platform: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub event_count: i64,
    pub user_count: i64,
    /// Event id used for routing to a representative occurrence
    pub representative_id: String,
    /// Hourly buckets over the trailing 24 hours
    pub timeline: Vec<TimelinePoint>,
}

/// One hourly bucket of a group's timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub timestamp: DateTime<Utc>,
    pub count: i64,
}
