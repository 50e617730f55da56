//! Settings, security policy, and project settings operations

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::domain::{ProjectSettings, SecurityPolicy};

use super::parse_rfc3339;

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<String, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v).unwrap_or_default())
}

pub async fn update_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_all_settings(pool: &SqlitePool) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Security policy for a project; an unenforced default when none exists
pub async fn get_security_policy(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<SecurityPolicy, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        project_id: String,
        ip_whitelist: String,
        allowed_domains: String,
        enforced: bool,
    }

    let row = sqlx::query_as::<_, Row>(
        "SELECT project_id, ip_whitelist, allowed_domains, enforced FROM security_policies WHERE project_id = ?",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(r) => SecurityPolicy {
            project_id: r.project_id,
            ip_whitelist: r.ip_whitelist,
            allowed_domains: r.allowed_domains,
            enforced: r.enforced,
        },
        None => SecurityPolicy::unenforced(project_id),
    })
}

pub async fn update_security_policy(
    pool: &SqlitePool,
    policy: &SecurityPolicy,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR REPLACE INTO security_policies (project_id, ip_whitelist, allowed_domains, enforced) VALUES (?, ?, ?, ?)",
    )
    .bind(&policy.project_id)
    .bind(&policy.ip_whitelist)
    .bind(&policy.allowed_domains)
    .bind(policy.enforced)
    .execute(pool)
    .await?;
    Ok(())
}

/// Notification preferences for a project; defaults when none exist
pub async fn get_project_settings(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<ProjectSettings, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        project_id: String,
        notification_enabled: bool,
        notification_levels: String,
        notification_frequency: String,
        notification_email: String,
        notification_webhook_url: String,
        notification_rate_limit: i64,
        updated_at: String,
    }

    let row = sqlx::query_as::<_, Row>("SELECT * FROM project_settings WHERE project_id = ?")
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

    Ok(match row {
        Some(r) => ProjectSettings {
            project_id: r.project_id,
            notification_enabled: r.notification_enabled,
            notification_levels: r.notification_levels,
            notification_frequency: r.notification_frequency,
            notification_email: r.notification_email,
            notification_webhook_url: r.notification_webhook_url,
            notification_rate_limit: r.notification_rate_limit,
            updated_at: parse_rfc3339(&r.updated_at),
        },
        None => ProjectSettings::defaults(project_id),
    })
}

pub async fn update_project_settings(
    pool: &SqlitePool,
    settings: &ProjectSettings,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR REPLACE INTO project_settings (project_id, notification_enabled, notification_levels, notification_frequency, notification_email, notification_webhook_url, notification_rate_limit, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&settings.project_id)
    .bind(settings.notification_enabled)
    .bind(&settings.notification_levels)
    .bind(&settings.notification_frequency)
    .bind(&settings.notification_email)
    .bind(&settings.notification_webhook_url)
    .bind(settings.notification_rate_limit)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}
