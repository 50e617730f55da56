//! Derived error group queries
//!
//! Grouping is computed from stored error rows at query time. The group key
//! is the stored fingerprint; rows without one fall back to
//! `message:level`.

use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::{ErrorGroup, TimelinePoint};

use super::parse_rfc3339;

/// SQL expression deriving the group key of one error row
const GROUP_KEY: &str =
    "CASE WHEN fingerprint != '' THEN fingerprint ELSE message || ':' || level END";

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    group_key: String,
    message: String,
    level: String,
    status: String,
    project_id: String,
    environment: String,
    platform: String,
    first_seen: String,
    last_seen: String,
    event_count: i64,
    representative_id: String,
}

/// Paginated error groups for a project, most recently seen first
///
/// `cursor` is the previous page's last `last_seen` value; returns the
/// groups, the next cursor, and whether more pages remain.
pub async fn get_error_groups(
    pool: &SqlitePool,
    project_id: &str,
    limit: i64,
    cursor: Option<&str>,
    status: Option<&str>,
) -> Result<(Vec<ErrorGroup>, Option<String>, bool), sqlx::Error> {
    let mut sql = format!(
        "SELECT {GROUP_KEY} AS group_key, message, level, status, project_id, environment, platform, \
         MIN(created_at) AS first_seen, MAX(created_at) AS last_seen, COUNT(*) AS event_count, \
         MAX(id) AS representative_id \
         FROM errors WHERE project_id = ?"
    );
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" GROUP BY group_key, message, level, status, environment, platform");
    if cursor.is_some() {
        sql.push_str(" HAVING MAX(created_at) < ?");
    }
    sql.push_str(" ORDER BY last_seen DESC LIMIT ?");

    let mut query = sqlx::query_as::<_, GroupRow>(&sql).bind(project_id);
    if let Some(status) = status {
        query = query.bind(status);
    }
    if let Some(cursor) = cursor {
        query = query.bind(cursor);
    }
    // Fetch one extra row to detect whether another page exists
    let mut rows = query.bind(limit + 1).fetch_all(pool).await?;

    let has_more = rows.len() as i64 > limit;
    if has_more {
        rows.truncate(limit as usize);
    }

    let next_cursor = rows.last().map(|r| r.last_seen.clone());

    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        let user_count = get_group_user_count(pool, project_id, &row.group_key).await?;
        let timeline =
            get_group_timeline(pool, project_id, &row.group_key, Duration::hours(24)).await?;
        groups.push(ErrorGroup {
            fingerprint: row.group_key,
            message: row.message,
            level: row.level,
            status: row.status,
            project_id: row.project_id,
            environment: row.environment,
            platform: row.platform,
            first_seen: parse_rfc3339(&row.first_seen),
            last_seen: parse_rfc3339(&row.last_seen),
            event_count: row.event_count,
            user_count,
            representative_id: row.representative_id,
            timeline,
        });
    }

    Ok((groups, next_cursor, has_more))
}

/// Distinct users observed across a group's events
async fn get_group_user_count(
    pool: &SqlitePool,
    project_id: &str,
    group_key: &str,
) -> Result<i64, sqlx::Error> {
    let sql = format!(
        "SELECT COUNT(DISTINCT user) FROM errors \
         WHERE project_id = ? AND {GROUP_KEY} = ? AND user != '' AND user != '{{}}'"
    );
    let (count,): (i64,) = sqlx::query_as(&sql)
        .bind(project_id)
        .bind(group_key)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Hourly buckets of a group's events over the trailing window
async fn get_group_timeline(
    pool: &SqlitePool,
    project_id: &str,
    group_key: &str,
    window: Duration,
) -> Result<Vec<TimelinePoint>, sqlx::Error> {
    let cutoff = (Utc::now() - window).to_rfc3339();
    let sql = format!(
        "SELECT strftime('%Y-%m-%d %H:00:00', created_at) AS hour, COUNT(*) AS count \
         FROM errors WHERE project_id = ? AND {GROUP_KEY} = ? AND created_at >= ? \
         GROUP BY hour ORDER BY hour DESC"
    );
    let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
        .bind(project_id)
        .bind(group_key)
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(hour, count)| {
            NaiveDateTime::parse_from_str(&hour, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| TimelinePoint {
                    timestamp: naive.and_utc(),
                    count,
                })
        })
        .collect())
}

/// One group's aggregate view, by its key
pub async fn get_error_group(
    pool: &SqlitePool,
    project_id: &str,
    group_key: &str,
) -> Result<Option<ErrorGroup>, sqlx::Error> {
    let sql = format!(
        "SELECT {GROUP_KEY} AS group_key, message, level, status, project_id, environment, platform, \
         MIN(created_at) AS first_seen, MAX(created_at) AS last_seen, COUNT(*) AS event_count, \
         MAX(id) AS representative_id \
         FROM errors WHERE project_id = ? AND {GROUP_KEY} = ? \
         GROUP BY group_key, message, level, status, environment, platform"
    );
    let row = sqlx::query_as::<_, GroupRow>(&sql)
        .bind(project_id)
        .bind(group_key)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let user_count = get_group_user_count(pool, project_id, group_key).await?;
    let timeline = get_group_timeline(pool, project_id, group_key, Duration::hours(24)).await?;

    Ok(Some(ErrorGroup {
        fingerprint: row.group_key,
        message: row.message,
        level: row.level,
        status: row.status,
        project_id: row.project_id,
        environment: row.environment,
        platform: row.platform,
        first_seen: parse_rfc3339(&row.first_seen),
        last_seen: parse_rfc3339(&row.last_seen),
        event_count: row.event_count,
        user_count,
        representative_id: row.representative_id,
        timeline,
    }))
}
