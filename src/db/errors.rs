//! Error event database operations

use sqlx::SqlitePool;

use crate::domain::{ErrorEvent, ErrorStatus};

use super::parse_rfc3339;

/// Row type for the errors table
#[derive(Debug, sqlx::FromRow)]
pub struct ErrorEventRow {
    pub id: String,
    pub project_id: String,
    pub message: String,
    pub level: String,
    pub environment: String,
    pub release: String,
    pub platform: String,
    pub timestamp: String,
    pub stacktrace: String,
    pub context: String,
    pub user: String,
    pub tags: String,
    pub status: String,
    pub fingerprint: String,
    pub trace_id: String,
    pub created_at: String,
}

impl ErrorEventRow {
    pub fn to_error_event(&self) -> ErrorEvent {
        ErrorEvent {
            id: self.id.clone(),
            project_id: self.project_id.clone(),
            message: self.message.clone(),
            level: self.level.parse().unwrap_or_default(),
            environment: self.environment.clone(),
            release: self.release.clone(),
            platform: self.platform.clone(),
            timestamp: parse_rfc3339(&self.timestamp),
            stacktrace: self.stacktrace.clone(),
            context: self.context.clone(),
            user: self.user.clone(),
            tags: self.tags.clone(),
            status: self.status.parse().unwrap_or_default(),
            fingerprint: self.fingerprint.clone(),
            trace_id: self.trace_id.clone(),
            created_at: parse_rfc3339(&self.created_at),
        }
    }
}

pub(crate) const INSERT_ERROR_SQL: &str = "INSERT INTO errors (id, project_id, message, level, environment, release, platform, timestamp, stacktrace, context, user, tags, status, fingerprint, trace_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

pub(crate) fn bind_error<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    event: &'q ErrorEvent,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&event.id)
        .bind(&event.project_id)
        .bind(&event.message)
        .bind(event.level.to_string())
        .bind(&event.environment)
        .bind(&event.release)
        .bind(&event.platform)
        .bind(event.timestamp.to_rfc3339())
        .bind(&event.stacktrace)
        .bind(&event.context)
        .bind(&event.user)
        .bind(&event.tags)
        .bind(event.status.to_string())
        .bind(&event.fingerprint)
        .bind(&event.trace_id)
        .bind(event.created_at.to_rfc3339())
}

/// Insert one error event and bump the project counter in one transaction
pub async fn insert_error(pool: &SqlitePool, event: &ErrorEvent) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    bind_error(sqlx::query(INSERT_ERROR_SQL), event)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE projects SET current_month_events = current_month_events + 1 WHERE id = ?")
        .bind(&event.project_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// List a project's errors with pagination and an optional status filter
pub async fn get_errors(
    pool: &SqlitePool,
    project_id: &str,
    limit: i64,
    offset: i64,
    status: Option<&str>,
) -> Result<(Vec<ErrorEvent>, i64), sqlx::Error> {
    let mut filter = String::from("FROM errors WHERE project_id = ?");
    if status.is_some() {
        filter.push_str(" AND status = ?");
    }

    let count_sql = format!("SELECT COUNT(*) {}", filter);
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql).bind(project_id);
    if let Some(status) = status {
        count_query = count_query.bind(status);
    }
    let (total,) = count_query.fetch_one(pool).await?;

    let select_sql = format!(
        "SELECT * {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        filter
    );
    let mut query = sqlx::query_as::<_, ErrorEventRow>(&select_sql).bind(project_id);
    if let Some(status) = status {
        query = query.bind(status);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    Ok((rows.iter().map(|r| r.to_error_event()).collect(), total))
}

/// List errors across all projects
pub async fn get_all_errors(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
    status: Option<&str>,
) -> Result<(Vec<ErrorEvent>, i64), sqlx::Error> {
    let filter = match status {
        Some(_) => "FROM errors WHERE status = ?",
        None => "FROM errors",
    };

    let count_sql = format!("SELECT COUNT(*) {}", filter);
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
    if let Some(status) = status {
        count_query = count_query.bind(status);
    }
    let (total,) = count_query.fetch_one(pool).await?;

    let select_sql = format!("SELECT * {} ORDER BY created_at DESC LIMIT ? OFFSET ?", filter);
    let mut query = sqlx::query_as::<_, ErrorEventRow>(&select_sql);
    if let Some(status) = status {
        query = query.bind(status);
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;

    Ok((rows.iter().map(|r| r.to_error_event()).collect(), total))
}

pub async fn get_error(pool: &SqlitePool, id: &str) -> Result<Option<ErrorEvent>, sqlx::Error> {
    let row = sqlx::query_as::<_, ErrorEventRow>("SELECT * FROM errors WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.to_error_event()))
}

pub async fn delete_error(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM errors WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_error_status(
    pool: &SqlitePool,
    id: &str,
    status: ErrorStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE errors SET status = ? WHERE id = ?")
        .bind(status.to_string())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All occurrences sharing a fingerprint within a project, newest first
pub async fn get_error_occurrences(
    pool: &SqlitePool,
    project_id: &str,
    fingerprint: &str,
    limit: i64,
) -> Result<Vec<ErrorEvent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ErrorEventRow>(
        "SELECT * FROM errors WHERE project_id = ? AND fingerprint = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(project_id)
    .bind(fingerprint)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.to_error_event()).collect())
}

/// Delete errors older than the cutoff; returns the number removed
pub async fn delete_errors_before(
    pool: &SqlitePool,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM errors WHERE created_at < ?")
        .bind(cutoff.to_rfc3339())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::db::{create_project, get_project};
    use crate::domain::Level;

    async fn seed(pool: &SqlitePool) -> String {
        create_project(pool, "p").await.unwrap().id
    }

    #[tokio::test]
    async fn test_insert_increments_counter() {
        let pool = test_pool().await;
        let project_id = seed(&pool).await;

        let event = ErrorEvent::new(&project_id, "boom").with_level(Level::Fatal);
        insert_error(&pool, &event).await.unwrap();

        let stored = get_error(&pool, &event.id).await.unwrap().unwrap();
        assert_eq!(stored.message, "boom");
        assert_eq!(stored.level, Level::Fatal);
        assert_eq!(stored.project_id, project_id);

        let project = get_project(&pool, &project_id).await.unwrap().unwrap();
        assert_eq!(project.current_month_events, 1);
    }

    #[tokio::test]
    async fn test_list_with_status_filter() {
        let pool = test_pool().await;
        let project_id = seed(&pool).await;

        for i in 0..3 {
            let event = ErrorEvent::new(&project_id, format!("e{}", i));
            insert_error(&pool, &event).await.unwrap();
        }
        let resolved = ErrorEvent::new(&project_id, "done");
        insert_error(&pool, &resolved).await.unwrap();
        update_error_status(&pool, &resolved.id, ErrorStatus::Resolved)
            .await
            .unwrap();

        let (all, total) = get_errors(&pool, &project_id, 50, 0, None).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(all.len(), 4);

        let (unresolved, total) = get_errors(&pool, &project_id, 50, 0, Some("unresolved"))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert!(unresolved.iter().all(|e| e.status == ErrorStatus::Unresolved));
    }

    #[tokio::test]
    async fn test_pagination() {
        let pool = test_pool().await;
        let project_id = seed(&pool).await;

        for i in 0..5 {
            insert_error(&pool, &ErrorEvent::new(&project_id, format!("e{}", i)))
                .await
                .unwrap();
        }

        let (page, total) = get_errors(&pool, &project_id, 2, 2, None).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_occurrences_share_fingerprint() {
        let pool = test_pool().await;
        let project_id = seed(&pool).await;

        let mut first = ErrorEvent::new(&project_id, "boom");
        first.fingerprint = "aaaa000011112222".to_string();
        let mut second = ErrorEvent::new(&project_id, "boom");
        second.fingerprint = "aaaa000011112222".to_string();
        let mut other = ErrorEvent::new(&project_id, "bang");
        other.fingerprint = "ffff000011112222".to_string();

        for e in [&first, &second, &other] {
            insert_error(&pool, e).await.unwrap();
        }

        let occurrences = get_error_occurrences(&pool, &project_id, "aaaa000011112222", 10)
            .await
            .unwrap();
        assert_eq!(occurrences.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_error() {
        let pool = test_pool().await;
        let project_id = seed(&pool).await;

        let event = ErrorEvent::new(&project_id, "boom");
        insert_error(&pool, &event).await.unwrap();

        assert!(delete_error(&pool, &event.id).await.unwrap());
        assert!(!delete_error(&pool, &event.id).await.unwrap());
        assert!(get_error(&pool, &event.id).await.unwrap().is_none());
    }
}
