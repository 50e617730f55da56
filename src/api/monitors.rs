//! Monitor management and the public status page

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::domain::{
    Monitor, MonitorCheck, MonitorStatus, MonitorType, DEFAULT_TIMEOUT_SECONDS,
    MAX_TIMEOUT_SECONDS, MIN_INTERVAL_SECONDS, MIN_TIMEOUT_SECONDS,
};

use super::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateMonitorRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub monitor_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub interval: i64,
    #[serde(default)]
    pub timeout: i64,
}

/// GET /api/projects/:project_id/monitors
pub async fn list_monitors(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Monitor>>, AppError> {
    let monitors = db::get_project_monitors(&state.pool, &project_id).await?;
    Ok(Json(monitors))
}

/// POST /api/projects/:project_id/monitors
pub async fn create_monitor(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<CreateMonitorRequest>,
) -> Result<Json<Monitor>, AppError> {
    if req.name.is_empty() || req.url.is_empty() {
        return Err(AppError::BadRequest(
            "Name and URL/target are required".to_string(),
        ));
    }

    let monitor_type = if req.monitor_type.is_empty() {
        MonitorType::Http
    } else {
        req.monitor_type.parse().map_err(|_| {
            AppError::BadRequest(
                "Invalid monitor type. Supported: http, https, tcp, icmp, dns".to_string(),
            )
        })?
    };

    let mut monitor = Monitor::new(&project_id, &req.name, &req.url);
    monitor.monitor_type = monitor_type;
    monitor.interval = req.interval.max(MIN_INTERVAL_SECONDS);
    monitor.timeout = if req.timeout < MIN_TIMEOUT_SECONDS {
        DEFAULT_TIMEOUT_SECONDS
    } else {
        req.timeout.min(MAX_TIMEOUT_SECONDS)
    };

    db::create_monitor(&state.pool, &monitor).await?;
    Ok(Json(monitor))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMonitorRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub monitor_type: Option<String>,
    pub url: Option<String>,
    pub interval: Option<i64>,
    pub timeout: Option<i64>,
    pub status: Option<String>,
}

/// PUT/PATCH /api/projects/:project_id/monitors/:monitor_id
pub async fn update_monitor(
    State(state): State<AppState>,
    Path((_project_id, monitor_id)): Path<(String, String)>,
    Json(req): Json<UpdateMonitorRequest>,
) -> Result<Json<Monitor>, AppError> {
    let mut monitor = db::get_monitor(&state.pool, &monitor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Monitor not found".to_string()))?;

    if let Some(name) = req.name.filter(|n| !n.is_empty()) {
        monitor.name = name;
    }
    if let Some(monitor_type) = req.monitor_type.filter(|t| !t.is_empty()) {
        monitor.monitor_type = monitor_type.parse().map_err(|_| {
            AppError::BadRequest(
                "Invalid monitor type. Supported: http, https, tcp, icmp, dns".to_string(),
            )
        })?;
    }
    if let Some(url) = req.url.filter(|u| !u.is_empty()) {
        monitor.url = url;
    }
    if let Some(interval) = req.interval.filter(|i| *i > 0) {
        monitor.interval = interval.max(MIN_INTERVAL_SECONDS);
    }
    if let Some(timeout) = req.timeout.filter(|t| *t > 0) {
        monitor.timeout = if timeout < MIN_TIMEOUT_SECONDS {
            DEFAULT_TIMEOUT_SECONDS
        } else {
            timeout.min(MAX_TIMEOUT_SECONDS)
        };
    }
    if let Some(status) = req.status.filter(|s| !s.is_empty()) {
        monitor.status = status
            .parse()
            .map_err(|e: String| AppError::BadRequest(e))?;
    }

    db::update_monitor(&state.pool, &monitor).await?;
    Ok(Json(monitor))
}

/// DELETE /api/projects/:project_id/monitors/:monitor_id
pub async fn delete_monitor(
    State(state): State<AppState>,
    Path((_project_id, monitor_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    if !db::delete_monitor(&state.pool, &monitor_id).await? {
        return Err(AppError::NotFound("Monitor not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct StatusPageMonitor {
    #[serde(flatten)]
    pub monitor: Monitor,
    pub uptime_24h: f64,
    pub uptime_7d: f64,
    pub uptime_30d: f64,
    pub recent_checks: Vec<MonitorCheck>,
}

#[derive(Debug, Serialize)]
pub struct StatusPageResponse {
    pub project: serde_json::Value,
    pub monitors: Vec<StatusPageMonitor>,
}

/// Share of "up" checks within a trailing window
fn uptime_within(checks: &[MonitorCheck], window: Duration) -> f64 {
    let cutoff = Utc::now() - window;
    let mut up = 0usize;
    let mut total = 0usize;
    for check in checks {
        if check.created_at > cutoff {
            total += 1;
            if check.status == MonitorStatus::Up {
                up += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        up as f64 / total as f64 * 100.0
    }
}

/// GET /api/status/:project_id - public, unauthenticated status page
pub async fn status_page(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<StatusPageResponse>, AppError> {
    let project = db::get_project(&state.pool, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let monitors = db::get_project_monitors(&state.pool, &project_id).await?;

    let mut page_monitors = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        let checks = db::get_monitor_checks(&state.pool, &monitor.id, 1000).await?;

        let uptime_24h = uptime_within(&checks, Duration::hours(24));
        let uptime_7d = uptime_within(&checks, Duration::days(7));
        let uptime_30d = uptime_within(&checks, Duration::days(30));

        let recent_checks = checks.into_iter().take(50).collect();

        page_monitors.push(StatusPageMonitor {
            monitor,
            uptime_24h,
            uptime_7d,
            uptime_30d,
            recent_checks,
        });
    }

    Ok(Json(StatusPageResponse {
        project: serde_json::json!({ "id": project.id, "name": project.name }),
        monitors: page_monitors,
    }))
}
