//! Per-project settings and security policy models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ingestion security policy for a project
///
/// The IP whitelist is a free-form string; membership is a simple
/// containment match, CIDR ranges are not interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub project_id: String,
    pub ip_whitelist: String,
    pub allowed_domains: String,
    pub enforced: bool,
}

impl SecurityPolicy {
    /// Unenforced default, returned when no policy row exists
    pub fn unenforced(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ip_whitelist: String::new(),
            allowed_domains: String::new(),
            enforced: false,
        }
    }

    /// Whether the given client IP is allowed through
    pub fn allows(&self, client_ip: &str) -> bool {
        if !self.enforced || self.ip_whitelist.is_empty() {
            return true;
        }
        self.ip_whitelist.contains(client_ip)
    }
}

/// Notification preferences for a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub project_id: String,
    pub notification_enabled: bool,
    /// Comma-separated levels, e.g. "error,fatal"
    pub notification_levels: String,
    /// immediate, hourly, daily
    pub notification_frequency: String,
    pub notification_email: String,
    pub notification_webhook_url: String,
    /// Minimum minutes between notifications for the project
    pub notification_rate_limit: i64,
    pub updated_at: DateTime<Utc>,
}

impl ProjectSettings {
    pub fn defaults(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            notification_enabled: true,
            notification_levels: "error,fatal".to_string(),
            notification_frequency: "immediate".to_string(),
            notification_email: String::new(),
            notification_webhook_url: String::new(),
            notification_rate_limit: 60,
            updated_at: Utc::now(),
        }
    }

    /// Whether the level filter admits the given level name
    pub fn level_enabled(&self, level: &str) -> bool {
        self.notification_levels
            .split(',')
            .any(|l| l.trim() == level)
    }
}
