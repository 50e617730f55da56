//! Error read API: lists, groups, occurrences, triage

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::domain::{ErrorEvent, ErrorGroup, ErrorStatus};

use super::{AppError, AppState, PageMeta, Paginated};

#[derive(Debug, Deserialize)]
pub struct ListErrorsQuery {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 100)
}

/// GET /api/errors - errors across all projects, or one via ?projectId
pub async fn list_all_errors(
    State(state): State<AppState>,
    Query(query): Query<ListErrorsQuery>,
) -> Result<Json<Paginated<ErrorEvent>>, AppError> {
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);
    let status = query.status.as_deref().filter(|s| !s.is_empty());

    let (data, total) = match &query.project_id {
        Some(project_id) => db::get_errors(&state.pool, project_id, limit, offset, status).await?,
        None => db::get_all_errors(&state.pool, limit, offset, status).await?,
    };

    Ok(Json(Paginated {
        data,
        meta: PageMeta { total, limit, offset },
    }))
}

/// GET /api/projects/:project_id/errors
pub async fn list_project_errors(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<ListErrorsQuery>,
) -> Result<Json<Paginated<ErrorEvent>>, AppError> {
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);
    let status = query.status.as_deref().filter(|s| !s.is_empty());

    let (data, total) = db::get_errors(&state.pool, &project_id, limit, offset, status).await?;

    Ok(Json(Paginated {
        data,
        meta: PageMeta { total, limit, offset },
    }))
}

#[derive(Debug, Deserialize)]
pub struct GroupsQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub data: Vec<ErrorGroup>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// GET /api/projects/:project_id/errors/groups - derived group view
pub async fn list_error_groups(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<GroupsQuery>,
) -> Result<Json<GroupsResponse>, AppError> {
    let limit = clamp_limit(query.limit);
    let status = query.status.as_deref().filter(|s| !s.is_empty());

    let (data, next_cursor, has_more) = db::get_error_groups(
        &state.pool,
        &project_id,
        limit,
        query.cursor.as_deref(),
        status,
    )
    .await?;

    Ok(Json(GroupsResponse {
        data,
        next_cursor,
        has_more,
    }))
}

/// GET /api/errors/:id
pub async fn get_error(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ErrorEvent>, AppError> {
    let event = db::get_error(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Error not found".to_string()))?;
    Ok(Json(event))
}

/// GET /api/errors/:id/occurrences - other events in the same group
pub async fn get_error_occurrences(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ErrorEvent>>, AppError> {
    let event = db::get_error(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Error not found".to_string()))?;

    let occurrences =
        db::get_error_occurrences(&state.pool, &event.project_id, &event.fingerprint, 100).await?;
    Ok(Json(occurrences))
}

/// DELETE /api/errors/:id
pub async fn delete_error(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !db::delete_error(&state.pool, &id).await? {
        return Err(AppError::NotFound("Error not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// PATCH /api/errors/:id - triage status update
pub async fn update_error_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<StatusCode, AppError> {
    let status: ErrorStatus = req
        .status
        .parse()
        .map_err(|e: String| AppError::BadRequest(e))?;

    if !db::update_error_status(&state.pool, &id, status).await? {
        return Err(AppError::NotFound("Error not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
