//! Project domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project that owns error events, spans, and monitors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Globally unique ingestion credential
    pub api_key: String,
    /// Monthly event ceiling; 0 disables the quota
    pub max_events_per_month: i64,
    pub current_month_events: i64,
    pub coverage: f64,
    pub coverage_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            api_key: Uuid::new_v4().to_string(),
            max_events_per_month: 1000,
            current_month_events: 0,
            coverage: 0.0,
            coverage_updated_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the project has used up its monthly event allowance
    pub fn quota_exceeded(&self) -> bool {
        self.max_events_per_month > 0 && self.current_month_events >= self.max_events_per_month
    }
}

/// One point of a project's coverage history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    pub id: String,
    pub project_id: String,
    pub percentage: f64,
    pub created_at: DateTime<Utc>,
}

/// Per-file breakdown attached to a coverage snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    pub file_path: String,
    pub percentage: f64,
}

/// An archived API key, written on rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyHistory {
    pub id: String,
    pub project_id: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}
