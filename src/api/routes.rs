//! API route definitions

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{auth, coverage, errors, ingest, monitors, projects, settings, AppState};

/// Build the API router
///
/// Ingestion, discovery, the public status page, coverage surfaces, and
/// login stay open (API-key auth happens inside the handlers); everything
/// else requires a dashboard session.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        // Health
        .route("/health", get(health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Ingestion
        .route("/store", post(ingest::store_legacy))
        .route("/:project_id/store", post(ingest::store_event))
        .route("/:project_id/store/", post(ingest::store_event))
        .route("/:project_id/envelope", post(ingest::store_envelope))
        .route("/:project_id/envelope/", post(ingest::store_envelope))
        // Compatibility aliases for legacy/test paths
        .route("/projects/:project_id/envelope", post(ingest::store_envelope))
        .route("/projects/:project_id/envelope/", post(ingest::store_envelope))
        // Coverage upload (API key auth) and public badge
        .route("/:project_id/coverage", post(ingest::upload_coverage))
        .route("/projects/:project_id/coverage", post(ingest::upload_coverage))
        .route(
            "/projects/:project_id/coverage/badge",
            get(coverage::coverage_badge),
        )
        // SDK project discovery
        .route("/:project_id/", get(ingest::project_discovery))
        // Public status page
        .route("/status/:project_id", get(monitors::status_page));

    let protected = Router::new()
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:project_id",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route("/projects/:project_id/quota", patch(projects::update_quota))
        .route(
            "/projects/:project_id/settings",
            get(projects::get_settings)
                .put(projects::update_settings)
                .patch(projects::update_settings),
        )
        .route("/projects/:project_id/rotate-key", post(projects::rotate_key))
        .route("/projects/:project_id/key-history", get(projects::key_history))
        .route(
            "/projects/:project_id/security-policies",
            get(projects::get_security_policies).post(projects::update_security_policies),
        )
        // Errors
        .route("/errors", get(errors::list_all_errors))
        .route(
            "/errors/:id",
            get(errors::get_error)
                .delete(errors::delete_error)
                .patch(errors::update_error_status),
        )
        .route("/errors/:id/occurrences", get(errors::get_error_occurrences))
        .route(
            "/projects/:project_id/errors",
            get(errors::list_project_errors),
        )
        .route(
            "/projects/:project_id/errors/groups",
            get(errors::list_error_groups),
        )
        // Traces
        .route(
            "/projects/:project_id/traces",
            get(super::traces::list_traces),
        )
        .route(
            "/projects/:project_id/traces/:trace_id",
            get(super::traces::get_trace),
        )
        // Monitors
        .route(
            "/projects/:project_id/monitors",
            get(monitors::list_monitors).post(monitors::create_monitor),
        )
        .route(
            "/projects/:project_id/monitors/:monitor_id",
            put(monitors::update_monitor)
                .patch(monitors::update_monitor)
                .delete(monitors::delete_monitor),
        )
        // Coverage history
        .route(
            "/projects/:project_id/coverage/history",
            get(coverage::coverage_history),
        )
        .route(
            "/projects/:project_id/coverage/snapshots/:snapshot_id/files",
            get(coverage::file_coverage),
        )
        // Global settings + maintenance
        .route(
            "/settings",
            get(settings::get_global_settings)
                .post(settings::update_global_settings)
                .patch(settings::update_global_settings),
        )
        .route("/system/cleanup", post(settings::run_cleanup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/health
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "product": "Pulse" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::test_pool;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn app() -> (Router, AppState) {
        let pool = test_pool().await;
        let state = AppState::new(pool, Config::default());
        (build_router(state.clone()), state)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app().await;
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dashboard_routes_require_session() {
        let (app, _) = app().await;

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/projects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/projects")
                    .header("authorization", "Bearer bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_token_grants_access() {
        let (app, state) = app().await;

        let user = crate::domain::User::new("admin@example.com", "pw");
        crate::db::create_user(&state.pool, &user).await.unwrap();
        let token = crate::api::sign_token(&user, &state.config.jwt_secret).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/projects")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_flow() {
        let (app, state) = app().await;
        let user = crate::domain::User::new("admin@example.com", "hunter2");
        crate::db::create_user(&state.pool, &user).await.unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"email":"admin@example.com","password":"hunter2"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"email":"admin@example.com","password":"wrong"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
