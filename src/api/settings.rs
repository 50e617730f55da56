//! Global settings and system maintenance handlers

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};

use crate::db;

use super::{AppError, AppState};

const DEFAULT_RETENTION_DAYS: i64 = 30;

/// GET /api/settings
pub async fn get_global_settings(
    State(state): State<AppState>,
) -> Result<Json<HashMap<String, String>>, AppError> {
    let settings = db::get_all_settings(&state.pool).await?;
    Ok(Json(settings))
}

/// POST/PATCH /api/settings - upsert the posted key/value pairs
pub async fn update_global_settings(
    State(state): State<AppState>,
    Json(req): Json<HashMap<String, String>>,
) -> Result<StatusCode, AppError> {
    for (key, value) in &req {
        db::update_setting(&state.pool, key, value).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/system/cleanup - drop errors past the retention window
pub async fn run_cleanup(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let retention_days = db::get_setting(&state.pool, "retention_days")
        .await?
        .parse()
        .unwrap_or(DEFAULT_RETENTION_DAYS);

    let cutoff = Utc::now() - Duration::days(retention_days);
    let deleted = db::delete_errors_before(&state.pool, cutoff).await?;
    tracing::info!(
        "System cleanup: deleted {} old errors (older than {} days)",
        deleted,
        retention_days
    );

    Ok(Json(serde_json::json!({
        "deleted": deleted,
        "days": retention_days,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::db::{create_project, insert_error};
    use crate::domain::ErrorEvent;
    use axum::routing::{get, post};
    use axum::{body::Body, http::Request, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_settings_update_and_get() {
        let pool = test_pool().await;
        let state = AppState::new(pool, crate::config::Config::default());
        let app = Router::new()
            .route("/settings", get(get_global_settings).post(update_global_settings))
            .with_state(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/settings")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"slack_webhook":"https://hooks.example/a"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::builder().uri("/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["slack_webhook"], "https://hooks.example/a");
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_old_errors() {
        let pool = test_pool().await;
        let state = AppState::new(pool, crate::config::Config::default());
        let project = create_project(&state.pool, "p").await.unwrap();

        let mut old = ErrorEvent::new(&project.id, "old");
        old.created_at = Utc::now() - Duration::days(90);
        insert_error(&state.pool, &old).await.unwrap();

        let fresh = ErrorEvent::new(&project.id, "fresh");
        insert_error(&state.pool, &fresh).await.unwrap();

        let app = Router::new()
            .route("/system/cleanup", post(run_cleanup))
            .with_state(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/system/cleanup")
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
        assert_eq!(json["deleted"], 1);

        let (_, total) = db::get_errors(&state.pool, &project.id, 50, 0, None)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }
}
