//! Monitor database operations

use sqlx::SqlitePool;

use crate::domain::{Monitor, MonitorCheck, MonitorStatus, MonitorType, DEFAULT_TIMEOUT_SECONDS};

use super::{parse_rfc3339, parse_rfc3339_opt};

/// Row type for the monitors table
#[derive(Debug, sqlx::FromRow)]
pub struct MonitorRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub monitor_type: String,
    pub url: String,
    pub interval: i64,
    pub timeout: Option<i64>,
    pub status: String,
    pub last_checked_at: Option<String>,
    pub created_at: String,
}

impl MonitorRow {
    pub fn to_monitor(&self) -> Monitor {
        Monitor {
            id: self.id.clone(),
            project_id: self.project_id.clone(),
            name: self.name.clone(),
            monitor_type: self.monitor_type.parse().unwrap_or(MonitorType::Http),
            url: self.url.clone(),
            interval: self.interval,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            status: self.status.parse().unwrap_or(MonitorStatus::Up),
            last_checked_at: parse_rfc3339_opt(&self.last_checked_at),
            created_at: parse_rfc3339(&self.created_at),
        }
    }
}

pub async fn create_monitor(pool: &SqlitePool, monitor: &Monitor) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO monitors (id, project_id, name, type, url, interval, timeout, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&monitor.id)
    .bind(&monitor.project_id)
    .bind(&monitor.name)
    .bind(monitor.monitor_type.to_string())
    .bind(&monitor.url)
    .bind(monitor.interval)
    .bind(monitor.timeout)
    .bind(monitor.status.to_string())
    .bind(monitor.created_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_monitor(pool: &SqlitePool, monitor_id: &str) -> Result<Option<Monitor>, sqlx::Error> {
    let row = sqlx::query_as::<_, MonitorRow>("SELECT * FROM monitors WHERE id = ?")
        .bind(monitor_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.to_monitor()))
}

/// Monitors for a project, newest first
pub async fn get_project_monitors(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<Monitor>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MonitorRow>(
        "SELECT * FROM monitors WHERE project_id = ? ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.to_monitor()).collect())
}

/// Every monitor eligible for scheduling (not paused)
pub async fn get_all_active_monitors(pool: &SqlitePool) -> Result<Vec<Monitor>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MonitorRow>("SELECT * FROM monitors WHERE status != 'paused'")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|r| r.to_monitor()).collect())
}

pub async fn update_monitor(pool: &SqlitePool, monitor: &Monitor) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE monitors SET name = ?, type = ?, url = ?, interval = ?, timeout = ?, status = ? WHERE id = ?",
    )
    .bind(&monitor.name)
    .bind(monitor.monitor_type.to_string())
    .bind(&monitor.url)
    .bind(monitor.interval)
    .bind(monitor.timeout)
    .bind(monitor.status.to_string())
    .bind(&monitor.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_monitor(pool: &SqlitePool, monitor_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM monitors WHERE id = ?")
        .bind(monitor_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record a check and bring the monitor's status and last-checked time in
/// line with it
pub async fn insert_monitor_check(pool: &SqlitePool, check: &MonitorCheck) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO monitor_checks (id, monitor_id, status, response_time, status_code, error_message, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&check.id)
    .bind(&check.monitor_id)
    .bind(check.status.to_string())
    .bind(check.response_time)
    .bind(check.status_code)
    .bind(&check.error_message)
    .bind(check.created_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE monitors SET status = ?, last_checked_at = ? WHERE id = ?")
        .bind(check.status.to_string())
        .bind(check.created_at.to_rfc3339())
        .bind(&check.monitor_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Recent checks for a monitor, newest first
pub async fn get_monitor_checks(
    pool: &SqlitePool,
    monitor_id: &str,
    limit: i64,
) -> Result<Vec<MonitorCheck>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: String,
        monitor_id: String,
        status: String,
        response_time: i64,
        status_code: i64,
        error_message: String,
        created_at: String,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT * FROM monitor_checks WHERE monitor_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(monitor_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| MonitorCheck {
            id: r.id,
            monitor_id: r.monitor_id,
            status: r.status.parse().unwrap_or(MonitorStatus::Down),
            response_time: r.response_time,
            status_code: r.status_code,
            error_message: r.error_message,
            created_at: parse_rfc3339(&r.created_at),
        })
        .collect())
}
