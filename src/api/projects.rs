//! Project management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::domain::{Project, ProjectSettings, SecurityPolicy};

use super::{AppError, AppState};

/// GET /api/projects
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    let projects = db::list_projects(&state.pool).await?;
    Ok(Json(projects))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub name: String,
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    if req.name.is_empty() {
        return Err(AppError::BadRequest("Project name is required".to_string()));
    }

    let project = db::create_project(&state.pool, &req.name).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/:project_id
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, AppError> {
    let project = db::get_project(&state.pool, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Ok(Json(project))
}

/// DELETE /api/projects/:project_id - cascades to owned rows
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !db::delete_project(&state.pool, &project_id).await? {
        return Err(AppError::NotFound("Project not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuotaRequest {
    pub quota: i64,
}

/// PATCH /api/projects/:project_id/quota
pub async fn update_quota(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<UpdateQuotaRequest>,
) -> Result<StatusCode, AppError> {
    if req.quota < 0 {
        return Err(AppError::BadRequest("Quota must be non-negative".to_string()));
    }

    db::update_project_quota(&state.pool, &project_id, req.quota).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/projects/:project_id/settings
pub async fn get_settings(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectSettings>, AppError> {
    let settings = db::get_project_settings(&state.pool, &project_id).await?;
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub name: Option<String>,
    pub notification_enabled: Option<bool>,
    pub notification_levels: Option<String>,
    pub notification_frequency: Option<String>,
    pub notification_email: Option<String>,
    pub notification_webhook_url: Option<String>,
    pub notification_rate_limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub project: Project,
    pub settings: ProjectSettings,
}

/// PUT/PATCH /api/projects/:project_id/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    if let Some(name) = req.name.as_deref().filter(|n| !n.is_empty()) {
        db::update_project_name(&state.pool, &project_id, name).await?;
    }

    let mut settings = db::get_project_settings(&state.pool, &project_id).await?;
    if let Some(enabled) = req.notification_enabled {
        settings.notification_enabled = enabled;
    }
    if let Some(levels) = req.notification_levels.filter(|l| !l.is_empty()) {
        settings.notification_levels = levels;
    }
    if let Some(frequency) = req.notification_frequency.filter(|f| !f.is_empty()) {
        settings.notification_frequency = frequency;
    }
    if let Some(email) = req.notification_email {
        settings.notification_email = email;
    }
    if let Some(webhook) = req.notification_webhook_url {
        settings.notification_webhook_url = webhook;
    }
    if let Some(rate_limit) = req.notification_rate_limit {
        settings.notification_rate_limit = rate_limit;
    }
    settings.project_id = project_id.clone();

    db::update_project_settings(&state.pool, &settings).await?;

    let project = db::get_project(&state.pool, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(SettingsResponse { project, settings }))
}

#[derive(Debug, Serialize)]
pub struct RotateKeyResponse {
    pub api_key: String,
}

/// POST /api/projects/:project_id/rotate-key
pub async fn rotate_key(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<RotateKeyResponse>, AppError> {
    let api_key = db::rotate_api_key(&state.pool, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Ok(Json(RotateKeyResponse { api_key }))
}

/// GET /api/projects/:project_id/key-history
pub async fn key_history(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<crate::domain::ApiKeyHistory>>, AppError> {
    let history = db::get_api_key_history(&state.pool, &project_id).await?;
    Ok(Json(history))
}

/// GET /api/projects/:project_id/security-policies
pub async fn get_security_policies(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<SecurityPolicy>, AppError> {
    let policy = db::get_security_policy(&state.pool, &project_id).await?;
    Ok(Json(policy))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePolicyRequest {
    #[serde(default)]
    pub ip_whitelist: String,
    #[serde(default)]
    pub allowed_domains: String,
    #[serde(default)]
    pub enforced: bool,
}

/// POST /api/projects/:project_id/security-policies
pub async fn update_security_policies(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<UpdatePolicyRequest>,
) -> Result<StatusCode, AppError> {
    let policy = SecurityPolicy {
        project_id,
        ip_whitelist: req.ip_whitelist,
        allowed_domains: req.allowed_domains,
        enforced: req.enforced,
    };
    db::update_security_policy(&state.pool, &policy).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use axum::routing::{get, patch, post};
    use axum::{body::Body, http::Request, Router};
    use tower::ServiceExt;

    fn router(state: AppState) -> Router {
        Router::new()
            .route("/projects", get(list_projects).post(create_project))
            .route(
                "/projects/:project_id",
                get(get_project).delete(delete_project),
            )
            .route("/projects/:project_id/quota", patch(update_quota))
            .route("/projects/:project_id/rotate-key", post(rotate_key))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let pool = test_pool().await;
        let state = AppState::new(pool, crate::config::Config::default());
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/projects")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_and_delete_project() {
        let pool = test_pool().await;
        let state = AppState::new(pool, crate::config::Config::default());
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/projects")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Checkout"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let created: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let id = created["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/projects/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/projects/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_quota_update_rejects_negative() {
        let pool = test_pool().await;
        let state = AppState::new(pool, crate::config::Config::default());
        let project = db::create_project(&state.pool, "p").await.unwrap();
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/projects/{}/quota", project.id))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"quota":-5}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/projects/{}/quota", project.id))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"quota":500}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let fetched = db::get_project(&state.pool, &project.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.max_events_per_month, 500);
    }
}
