//! Error event domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity level of an error event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    #[default]
    Error,
    Fatal,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Debug => write!(f, "debug"),
            Level::Info => write!(f, "info"),
            Level::Warning => write!(f, "warning"),
            Level::Error => write!(f, "error"),
            Level::Fatal => write!(f, "fatal"),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warning" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(format!("Unknown level: {}", s)),
        }
    }
}

/// Triage status of an error event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStatus {
    #[default]
    Unresolved,
    Resolved,
    Ignored,
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorStatus::Unresolved => write!(f, "unresolved"),
            ErrorStatus::Resolved => write!(f, "resolved"),
            ErrorStatus::Ignored => write!(f, "ignored"),
        }
    }
}

impl std::str::FromStr for ErrorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unresolved" => Ok(ErrorStatus::Unresolved),
            "resolved" => Ok(ErrorStatus::Resolved),
            "ignored" => Ok(ErrorStatus::Ignored),
            _ => Err(format!("Unknown error status: {}", s)),
        }
    }
}

/// A normalized error event ready for persistence
///
/// Stacktrace, context, user, and tags are stored as opaque serialized JSON.
/// The engine never interprets them beyond fingerprint extraction of
/// `frames[].{filename,function,lineno}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub id: String,
    pub project_id: String,
    pub message: String,
    pub level: Level,
    pub environment: String,
    pub release: String,
    pub platform: String,
    /// Event time as reported by the client (may be backdated)
    pub timestamp: DateTime<Utc>,
    pub stacktrace: String,
    pub context: String,
    pub user: String,
    pub tags: String,
    pub status: ErrorStatus,
    pub fingerprint: String,
    pub trace_id: String,
    /// Ingestion time
    pub created_at: DateTime<Utc>,
}

impl ErrorEvent {
    pub fn new(project_id: impl Into<String>, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            message: message.into(),
            level: Level::Error,
            environment: String::new(),
            release: String::new(),
            platform: String::new(),
            timestamp: now,
            stacktrace: "{}".to_string(),
            context: "{}".to_string(),
            user: "{}".to_string(),
            tags: "{}".to_string(),
            status: ErrorStatus::Unresolved,
            fingerprint: String::new(),
            trace_id: String::new(),
            created_at: now,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = stacktrace.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Debug.to_string(), "debug");
        assert_eq!(Level::Info.to_string(), "info");
        assert_eq!(Level::Warning.to_string(), "warning");
        assert_eq!(Level::Error.to_string(), "error");
        assert_eq!(Level::Fatal.to_string(), "fatal");
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("fatal".parse::<Level>().unwrap(), Level::Fatal);
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warning);
        assert!("panic".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_default_is_error() {
        assert_eq!(Level::default(), Level::Error);
        assert_eq!("bogus".parse::<Level>().unwrap_or_default(), Level::Error);
    }

    #[test]
    fn test_error_status_round_trip() {
        for status in [ErrorStatus::Unresolved, ErrorStatus::Resolved, ErrorStatus::Ignored] {
            assert_eq!(status.to_string().parse::<ErrorStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_level_serialization() {
        let json = serde_json::to_string(&Level::Warning).unwrap();
        assert_eq!(json, "\"warning\"");

        let deserialized: Level = serde_json::from_str("\"fatal\"").unwrap();
        assert_eq!(deserialized, Level::Fatal);
    }

    #[test]
    fn test_error_event_new() {
        let event = ErrorEvent::new("p1", "boom");

        assert_eq!(event.project_id, "p1");
        assert_eq!(event.message, "boom");
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.status, ErrorStatus::Unresolved);
        assert_eq!(event.stacktrace, "{}");
        assert!(Uuid::parse_str(&event.id).is_ok());
    }

    #[test]
    fn test_error_event_builders() {
        let event = ErrorEvent::new("p1", "boom")
            .with_level(Level::Fatal)
            .with_platform("python")
            .with_stacktrace(r#"{"frames":[]}"#);

        assert_eq!(event.level, Level::Fatal);
        assert_eq!(event.platform, "python");
        assert_eq!(event.stacktrace, r#"{"frames":[]}"#);
    }
}
