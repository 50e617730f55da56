//! Trace span database operations

use sqlx::SqlitePool;

use crate::domain::TraceSpan;

use super::parse_rfc3339;

/// Row type for the spans table
#[derive(Debug, sqlx::FromRow)]
pub struct SpanRow {
    pub id: String,
    pub project_id: String,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: String,
    pub name: String,
    pub op: String,
    pub description: String,
    pub start_timestamp: String,
    pub timestamp: String,
    pub status: String,
    pub data: String,
}

impl SpanRow {
    pub fn to_span(&self) -> TraceSpan {
        TraceSpan {
            id: self.id.clone(),
            project_id: self.project_id.clone(),
            trace_id: self.trace_id.clone(),
            span_id: self.span_id.clone(),
            parent_span_id: self.parent_span_id.clone(),
            name: self.name.clone(),
            op: self.op.clone(),
            description: self.description.clone(),
            start_timestamp: parse_rfc3339(&self.start_timestamp),
            timestamp: parse_rfc3339(&self.timestamp),
            status: self.status.clone(),
            data: self.data.clone(),
        }
    }
}

/// Insert a span; root spans also bump the project's monthly event counter
pub async fn insert_span(pool: &SqlitePool, span: &TraceSpan) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO spans (id, project_id, trace_id, span_id, parent_span_id, name, op, description, start_timestamp, timestamp, status, data) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&span.id)
    .bind(&span.project_id)
    .bind(&span.trace_id)
    .bind(&span.span_id)
    .bind(&span.parent_span_id)
    .bind(&span.name)
    .bind(&span.op)
    .bind(&span.description)
    .bind(span.start_timestamp.to_rfc3339())
    .bind(span.timestamp.to_rfc3339())
    .bind(&span.status)
    .bind(&span.data)
    .execute(&mut *tx)
    .await?;

    // Only root spans (transactions) count against the quota
    if span.is_root() {
        sqlx::query("UPDATE projects SET current_month_events = current_month_events + 1 WHERE id = ?")
            .bind(&span.project_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await
}

/// Root spans for a project, newest first, optionally filtered by name
pub async fn get_project_root_spans(
    pool: &SqlitePool,
    project_id: &str,
    limit: i64,
    offset: i64,
    query: Option<&str>,
) -> Result<Vec<TraceSpan>, sqlx::Error> {
    let mut sql = String::from(
        "SELECT * FROM spans WHERE project_id = ? AND parent_span_id = ''",
    );
    if query.is_some() {
        sql.push_str(" AND (name LIKE ? OR op LIKE ?)");
    }
    sql.push_str(" ORDER BY start_timestamp DESC LIMIT ? OFFSET ?");

    let mut q = sqlx::query_as::<_, SpanRow>(&sql).bind(project_id);
    if let Some(query) = query {
        let pattern = format!("%{}%", query);
        q = q.bind(pattern.clone()).bind(pattern);
    }
    let rows = q.bind(limit).bind(offset).fetch_all(pool).await?;

    Ok(rows.iter().map(|r| r.to_span()).collect())
}

/// Every span of one trace, in start order
pub async fn get_trace_spans(pool: &SqlitePool, trace_id: &str) -> Result<Vec<TraceSpan>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SpanRow>(
        "SELECT * FROM spans WHERE trace_id = ? ORDER BY start_timestamp ASC",
    )
    .bind(trace_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.to_span()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::db::{create_project, get_project};

    fn span(project_id: &str, trace_id: &str, span_id: &str, parent: &str) -> TraceSpan {
        let mut s = TraceSpan::new(project_id);
        s.trace_id = trace_id.to_string();
        s.span_id = span_id.to_string();
        s.parent_span_id = parent.to_string();
        s.name = format!("span {}", span_id);
        s
    }

    #[tokio::test]
    async fn test_root_span_counts_against_quota() {
        let pool = test_pool().await;
        let project = create_project(&pool, "p").await.unwrap();

        insert_span(&pool, &span(&project.id, "T", "S", "")).await.unwrap();
        insert_span(&pool, &span(&project.id, "T", "c1", "S")).await.unwrap();
        insert_span(&pool, &span(&project.id, "T", "c2", "S")).await.unwrap();

        let fetched = get_project(&pool, &project.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_month_events, 1);
    }

    #[tokio::test]
    async fn test_root_span_listing_excludes_children() {
        let pool = test_pool().await;
        let project = create_project(&pool, "p").await.unwrap();

        insert_span(&pool, &span(&project.id, "T1", "a", "")).await.unwrap();
        insert_span(&pool, &span(&project.id, "T1", "b", "a")).await.unwrap();
        insert_span(&pool, &span(&project.id, "T2", "c", "")).await.unwrap();

        let roots = get_project_root_spans(&pool, &project.id, 50, 0, None)
            .await
            .unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(|s| s.is_root()));
    }

    #[tokio::test]
    async fn test_trace_assembly() {
        let pool = test_pool().await;
        let project = create_project(&pool, "p").await.unwrap();

        insert_span(&pool, &span(&project.id, "T1", "a", "")).await.unwrap();
        insert_span(&pool, &span(&project.id, "T1", "b", "a")).await.unwrap();
        insert_span(&pool, &span(&project.id, "T2", "c", "")).await.unwrap();

        let trace = get_trace_spans(&pool, "T1").await.unwrap();
        assert_eq!(trace.len(), 2);
        assert!(trace.iter().all(|s| s.trace_id == "T1"));
    }

    #[tokio::test]
    async fn test_root_span_name_filter() {
        let pool = test_pool().await;
        let project = create_project(&pool, "p").await.unwrap();

        let mut a = span(&project.id, "T1", "a", "");
        a.name = "GET /checkout".to_string();
        let mut b = span(&project.id, "T2", "b", "");
        b.name = "GET /login".to_string();
        insert_span(&pool, &a).await.unwrap();
        insert_span(&pool, &b).await.unwrap();

        let hits = get_project_root_spans(&pool, &project.id, 50, 0, Some("checkout"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "GET /checkout");
    }
}
