//! Uptime monitor domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum seconds between two checks of the same monitor
pub const MIN_INTERVAL_SECONDS: i64 = 60;
/// Probe timeout bounds in seconds
pub const MIN_TIMEOUT_SECONDS: i64 = 5;
pub const MAX_TIMEOUT_SECONDS: i64 = 300;
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 30;

/// Kind of probe a monitor runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorType {
    Http,
    Https,
    Tcp,
    /// Attempted as a TCP dial on common ports; raw sockets need privileges
    Icmp,
    Dns,
}

impl std::fmt::Display for MonitorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorType::Http => write!(f, "http"),
            MonitorType::Https => write!(f, "https"),
            MonitorType::Tcp => write!(f, "tcp"),
            MonitorType::Icmp => write!(f, "icmp"),
            MonitorType::Dns => write!(f, "dns"),
        }
    }
}

impl std::str::FromStr for MonitorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(MonitorType::Http),
            "https" => Ok(MonitorType::Https),
            "tcp" => Ok(MonitorType::Tcp),
            "icmp" => Ok(MonitorType::Icmp),
            "dns" => Ok(MonitorType::Dns),
            _ => Err(format!("Unknown monitor type: {}", s)),
        }
    }
}

/// Current state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    /// Operator-set; excluded from scheduling
    Paused,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
            MonitorStatus::Paused => write!(f, "paused"),
        }
    }
}

impl std::str::FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MonitorStatus::Up),
            "down" => Ok(MonitorStatus::Down),
            "paused" => Ok(MonitorStatus::Paused),
            _ => Err(format!("Unknown monitor status: {}", s)),
        }
    }
}

/// A user-configured uptime target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub monitor_type: MonitorType,
    pub url: String,
    /// Seconds between checks, at least [`MIN_INTERVAL_SECONDS`]
    pub interval: i64,
    /// Probe timeout in seconds, clamped to `[5, 300]`
    pub timeout: i64,
    pub status: MonitorStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Monitor {
    pub fn new(project_id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            name: name.into(),
            monitor_type: MonitorType::Http,
            url: url.into(),
            interval: MIN_INTERVAL_SECONDS,
            timeout: DEFAULT_TIMEOUT_SECONDS,
            status: MonitorStatus::Up,
            last_checked_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether enough time has passed since the last check
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_checked_at {
            Some(last) => (now - last).num_seconds() >= self.interval,
            None => true,
        }
    }

    /// Effective probe timeout with the documented bounds applied
    pub fn effective_timeout(&self) -> std::time::Duration {
        let secs = if self.timeout == 0 {
            DEFAULT_TIMEOUT_SECONDS
        } else {
            self.timeout.clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS)
        };
        std::time::Duration::from_secs(secs as u64)
    }
}

/// The recorded outcome of one probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorCheck {
    pub id: String,
    pub monitor_id: String,
    pub status: MonitorStatus,
    pub response_time: i64,
    pub status_code: i64,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
}

impl MonitorCheck {
    pub fn new(monitor_id: impl Into<String>, status: MonitorStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            monitor_id: monitor_id.into(),
            status,
            response_time: 0,
            status_code: 0,
            error_message: String::new(),
            created_at: Utc::now(),
        }
    }
}
