//! Project database operations

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::{ApiKeyHistory, CoverageSnapshot, FileCoverage, Project};

use super::{parse_rfc3339, parse_rfc3339_opt};

/// Row type for the projects table
#[derive(Debug, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub api_key: String,
    pub max_events_per_month: i64,
    pub current_month_events: i64,
    pub coverage: f64,
    pub coverage_updated_at: Option<String>,
    pub created_at: String,
}

impl ProjectRow {
    pub fn to_project(&self) -> Project {
        Project {
            id: self.id.clone(),
            name: self.name.clone(),
            api_key: self.api_key.clone(),
            max_events_per_month: self.max_events_per_month,
            current_month_events: self.current_month_events,
            coverage: self.coverage,
            coverage_updated_at: parse_rfc3339_opt(&self.coverage_updated_at),
            created_at: parse_rfc3339(&self.created_at),
        }
    }
}

/// Get a project by ID
pub async fn get_project(pool: &SqlitePool, project_id: &str) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.to_project()))
}

/// Get a project by its API key
pub async fn get_project_by_api_key(
    pool: &SqlitePool,
    api_key: &str,
) -> Result<Option<Project>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects WHERE api_key = ?")
        .bind(api_key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.to_project()))
}

/// Check that the presented API key matches the project's stored key
pub async fn validate_project_and_key(
    pool: &SqlitePool,
    project_id: &str,
    api_key: &str,
) -> Result<bool, sqlx::Error> {
    let stored: Option<(String,)> =
        sqlx::query_as("SELECT api_key FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(pool)
            .await?;

    Ok(matches!(stored, Some((key,)) if key == api_key))
}

/// List all projects, newest first
pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<Project>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProjectRow>("SELECT * FROM projects ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|r| r.to_project()).collect())
}

/// Create a new project with a generated API key
pub async fn create_project(pool: &SqlitePool, name: &str) -> Result<Project, sqlx::Error> {
    let project = Project::new(name);

    sqlx::query(
        "INSERT INTO projects (id, name, api_key, max_events_per_month, current_month_events, coverage, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&project.id)
    .bind(&project.name)
    .bind(&project.api_key)
    .bind(project.max_events_per_month)
    .bind(project.current_month_events)
    .bind(project.coverage)
    .bind(project.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(project)
}

pub async fn delete_project(pool: &SqlitePool, project_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_project_name(
    pool: &SqlitePool,
    project_id: &str,
    name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE projects SET name = ? WHERE id = ?")
        .bind(name)
        .bind(project_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_project_quota(
    pool: &SqlitePool,
    project_id: &str,
    quota: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE projects SET max_events_per_month = ? WHERE id = ?")
        .bind(quota)
        .bind(project_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Store a new coverage figure with a history snapshot and optional
/// per-file breakdown, all in one transaction
pub async fn update_project_coverage(
    pool: &SqlitePool,
    project_id: &str,
    coverage: f64,
    files: &[FileCoverage],
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE projects SET coverage = ?, coverage_updated_at = ? WHERE id = ?")
        .bind(coverage)
        .bind(&now)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

    let snapshot_id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO coverage_history (id, project_id, percentage, created_at) VALUES (?, ?, ?, ?)")
        .bind(&snapshot_id)
        .bind(project_id)
        .bind(coverage)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    for file in files {
        sqlx::query(
            "INSERT INTO file_coverage_snapshots (id, snapshot_id, file_path, percentage) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&snapshot_id)
        .bind(&file.file_path)
        .bind(file.percentage)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

pub async fn get_coverage_history(
    pool: &SqlitePool,
    project_id: &str,
    limit: i64,
) -> Result<Vec<CoverageSnapshot>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: String,
        project_id: String,
        percentage: f64,
        created_at: String,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT id, project_id, percentage, created_at FROM coverage_history WHERE project_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| CoverageSnapshot {
            id: r.id,
            project_id: r.project_id,
            percentage: r.percentage,
            created_at: parse_rfc3339(&r.created_at),
        })
        .collect())
}

pub async fn get_file_coverage(
    pool: &SqlitePool,
    snapshot_id: &str,
) -> Result<Vec<FileCoverage>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        file_path: String,
        percentage: f64,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT file_path, percentage FROM file_coverage_snapshots WHERE snapshot_id = ?",
    )
    .bind(snapshot_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| FileCoverage {
            file_path: r.file_path,
            percentage: r.percentage,
        })
        .collect())
}

/// Archive the current API key and issue a fresh one
pub async fn rotate_api_key(pool: &SqlitePool, project_id: &str) -> Result<Option<String>, sqlx::Error> {
    let current: Option<(String,)> = sqlx::query_as("SELECT api_key FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

    let Some((current_key,)) = current else {
        return Ok(None);
    };

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO api_key_history (id, project_id, api_key, created_at) VALUES (?, ?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(&current_key)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

    let new_key = Uuid::new_v4().to_string();
    sqlx::query("UPDATE projects SET api_key = ? WHERE id = ?")
        .bind(&new_key)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(new_key))
}

pub async fn get_api_key_history(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<ApiKeyHistory>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: String,
        project_id: String,
        api_key: String,
        created_at: String,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT id, project_id, api_key, created_at FROM api_key_history WHERE project_id = ? ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ApiKeyHistory {
            id: r.id,
            project_id: r.project_id,
            api_key: r.api_key,
            created_at: parse_rfc3339(&r.created_at),
        })
        .collect())
}
