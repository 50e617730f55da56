//! Trace read API

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::db;
use crate::domain::TraceSpan;

use super::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListTracesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub query: Option<String>,
}

/// GET /api/projects/:project_id/traces - root spans, newest first
pub async fn list_traces(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<ListTracesQuery>,
) -> Result<Json<Vec<TraceSpan>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 1000);
    let offset = query.offset.unwrap_or(0).max(0);
    let filter = query.query.as_deref().filter(|q| !q.is_empty());

    let spans = db::get_project_root_spans(&state.pool, &project_id, limit, offset, filter).await?;
    Ok(Json(spans))
}

/// GET /api/projects/:project_id/traces/:trace_id - one whole trace
pub async fn get_trace(
    State(state): State<AppState>,
    Path((_project_id, trace_id)): Path<(String, String)>,
) -> Result<Json<Vec<TraceSpan>>, AppError> {
    let spans = db::get_trace_spans(&state.pool, &trace_id).await?;
    if spans.is_empty() {
        return Err(AppError::NotFound("Trace not found".to_string()));
    }
    Ok(Json(spans))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::db::{create_project, insert_span};
    use axum::routing::get;
    use axum::{body::Body, http::Request, http::StatusCode, Router};
    use tower::ServiceExt;

    async fn seeded_state() -> (AppState, String) {
        let pool = test_pool().await;
        let state = AppState::new(pool, crate::config::Config::default());
        let project = create_project(&state.pool, "p").await.unwrap();

        let mut root = TraceSpan::new(&project.id);
        root.trace_id = "T1".to_string();
        root.span_id = "S1".to_string();
        root.name = "GET /checkout".to_string();
        insert_span(&state.pool, &root).await.unwrap();

        let mut child = TraceSpan::new(&project.id);
        child.trace_id = "T1".to_string();
        child.span_id = "c1".to_string();
        child.parent_span_id = "S1".to_string();
        insert_span(&state.pool, &child).await.unwrap();

        (state, project.id)
    }

    #[tokio::test]
    async fn test_list_traces_returns_roots_only() {
        let (state, project_id) = seeded_state().await;
        let app = Router::new()
            .route("/projects/:project_id/traces", get(list_traces))
            .with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/projects/{}/traces", project_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["span_id"], "S1");
    }

    #[tokio::test]
    async fn test_get_trace_detail() {
        let (state, project_id) = seeded_state().await;
        let app = Router::new()
            .route("/projects/:project_id/traces/:trace_id", get(get_trace))
            .with_state(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/projects/{}/traces/T1", project_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/projects/{}/traces/nope", project_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
