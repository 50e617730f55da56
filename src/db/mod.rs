//! Database module - SQLite with sqlx

mod errors;
mod groups;
mod monitors;
mod pool;
mod projects;
mod settings;
mod spans;
mod users;

pub use errors::*;
pub(crate) use errors::{bind_error, INSERT_ERROR_SQL};
pub use groups::*;
pub use monitors::*;
pub use pool::*;
#[cfg(test)]
pub(crate) use pool::test_pool;
pub use projects::*;
pub use settings::*;
pub use spans::*;
pub use users::*;

use chrono::{DateTime, Utc};

/// Parse an RFC3339 column value, falling back to now on corrupt rows
pub(crate) fn parse_rfc3339(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_rfc3339_opt(value: &Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_ref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
