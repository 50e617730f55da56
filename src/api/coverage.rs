//! Coverage read API: history, per-file snapshots, and the SVG badge

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};

use crate::db;
use crate::domain::{CoverageSnapshot, FileCoverage};

use super::{AppError, AppState};

const HISTORY_LIMIT: i64 = 30;

/// GET /api/projects/:project_id/coverage/history
pub async fn coverage_history(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<CoverageSnapshot>>, AppError> {
    let history = db::get_coverage_history(&state.pool, &project_id, HISTORY_LIMIT).await?;
    Ok(Json(history))
}

/// GET /api/projects/:project_id/coverage/snapshots/:snapshot_id/files
pub async fn file_coverage(
    State(state): State<AppState>,
    Path((_project_id, snapshot_id)): Path<(String, String)>,
) -> Result<Json<Vec<FileCoverage>>, AppError> {
    let files = db::get_file_coverage(&state.pool, &snapshot_id).await?;
    Ok(Json(files))
}

/// Badge color by coverage band: green >= 80, amber >= 50, red below
fn badge_color(coverage: f64) -> &'static str {
    if coverage >= 80.0 {
        "#10b981"
    } else if coverage >= 50.0 {
        "#f59e0b"
    } else {
        "#ef4444"
    }
}

fn badge_svg(coverage: f64) -> String {
    let color = badge_color(coverage);
    let text = if coverage == 0.0 {
        "N/A".to_string()
    } else {
        format!("{:.1}%", coverage)
    };

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="104" height="20">
	<linearGradient id="b" x2="0" y2="100%">
		<stop offset="0" stop-color="#bbb" stop-opacity=".1"/>
		<stop offset="1" stop-opacity=".1"/>
	</linearGradient>
	<mask id="a">
		<rect width="104" height="20" rx="3" fill="#fff"/>
	</mask>
	<g mask="url(#a)">
		<path fill="#555" d="M0 0h67v20H0z"/>
		<path fill="{color}" d="M67 0h37v20H67z"/>
		<path fill="url(#b)" d="M0 0h104v20H0z"/>
	</g>
	<g fill="#fff" text-anchor="middle" font-family="DejaVu Sans,Verdana,Geneva,sans-serif" font-size="11">
		<text x="33.5" y="15" fill="#010101" fill-opacity=".3">coverage</text>
		<text x="33.5" y="14">coverage</text>
		<text x="85.5" y="15" fill="#010101" fill-opacity=".3">{text}</text>
		<text x="85.5" y="14">{text}</text>
	</g>
</svg>"##,
        color = color,
        text = text
    )
}

/// GET /api/projects/:project_id/coverage/badge - shields-style SVG
pub async fn coverage_badge(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let project = db::get_project(&state.pool, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "image/svg+xml".parse().unwrap());
    headers.insert(
        header::CACHE_CONTROL,
        "no-cache, no-store, must-revalidate".parse().unwrap(),
    );

    Ok((headers, badge_svg(project.coverage)))
}
