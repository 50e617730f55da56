//! Ingestion handlers: legacy store, Sentry store, envelope, coverage upload

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, Multipart, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::coverage;
use crate::db;
use crate::domain::Project;
use crate::ingest::{self, client_ip, extract_api_key, GateError};
use crate::protocol::{parse_envelope, StoreRequest, WireEvent, WireTransaction};
use crate::workers::BatchEntry;

use super::{AppError, AppState};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: String,
}

/// Peek at the payload's `type` field to tell transactions from events
#[derive(Debug, Default, Deserialize)]
struct TypeProbe {
    #[serde(default, rename = "type")]
    event_type: String,
}

fn missing_key() -> AppError {
    AppError::Unauthorized(
        "Missing API key. Please include X-Sentry-Auth header with sentry_key parameter, or use X-Pulse-Auth header"
            .to_string(),
    )
}

/// Resolve and verify the credential for a per-project endpoint
async fn authorize_project(
    state: &AppState,
    project_id: &str,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Result<(), AppError> {
    let api_key = extract_api_key(headers, params.get("sentry_key").map(String::as_str))
        .ok_or_else(missing_key)?;

    let valid = db::validate_project_and_key(&state.pool, project_id, &api_key).await?;
    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid project ID or API key".to_string(),
        ));
    }
    Ok(())
}

/// Run the quota and IP-policy gate for one error event
async fn gate_event(
    state: &AppState,
    project: &Project,
    headers: &HeaderMap,
    remote: SocketAddr,
) -> Result<(), AppError> {
    let policy = db::get_security_policy(&state.pool, &project.id).await?;
    let ip = client_ip(headers, remote);
    ingest::check(project, &policy, &ip).map_err(|e| match e {
        GateError::QuotaExceeded => AppError::QuotaExceeded,
        GateError::IpNotAllowed => {
            AppError::Forbidden("Security policy violation: IP not allowed".to_string())
        }
    })
}

/// Hand one normalized error to the batched writer
async fn enqueue(
    state: &AppState,
    project: &Project,
    event: crate::domain::ErrorEvent,
) -> Result<(), AppError> {
    state
        .batch
        .send(BatchEntry {
            event,
            project: project.clone(),
        })
        .await
        .map_err(|e| AppError::InternalError(format!("Batch writer unavailable: {}", e)))
}

/// POST /api/store - legacy flat ingestion, project resolved by key alone
pub async fn store_legacy(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let api_key = extract_api_key(&headers, params.get("sentry_key").map(String::as_str))
        .ok_or_else(missing_key)?;

    let project = db::get_project_by_api_key(&state.pool, &api_key)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))?;

    let req: StoreRequest = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Invalid request body".to_string()))?;

    gate_event(&state, &project, &headers, remote).await?;

    let event = ingest::normalize_store_request(&project.id, req);
    let id = event.id.clone();
    enqueue(&state, &project, event).await?;

    Ok(Json(IngestResponse { id }))
}

/// POST /api/:project_id/store - Sentry-compatible event or transaction
pub async fn store_event(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    authorize_project(&state, &project_id, &headers, &params).await?;

    let project = db::get_project(&state.pool, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let policy = db::get_security_policy(&state.pool, &project.id).await?;
    let ip = client_ip(&headers, remote);
    if !policy.allows(&ip) {
        return Err(AppError::Forbidden(
            "Security policy violation: IP not allowed".to_string(),
        ));
    }

    let probe: TypeProbe = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    if probe.event_type == "transaction" {
        let tx: WireTransaction = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid transaction format: {}", e)))?;
        let event_id = tx.event_id.clone();
        let id = store_transaction(&state, &project, tx).await?;
        let id = if event_id.is_empty() { id } else { event_id };
        return Ok(Json(IngestResponse { id }));
    }

    let wire: WireEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    if project.quota_exceeded() {
        return Err(AppError::QuotaExceeded);
    }

    let event = ingest::normalize_event(&project.id, wire);
    let id = event.id.clone();
    enqueue(&state, &project, event).await?;

    Ok(Json(IngestResponse { id }))
}

/// Persist a transaction's span tree; the carried error (if any) goes
/// through the writer unless the quota is already spent. Returns the root
/// span id.
async fn store_transaction(
    state: &AppState,
    project: &Project,
    tx: WireTransaction,
) -> Result<String, AppError> {
    let normalized = ingest::normalize_transaction(&project.id, tx);

    db::insert_span(&state.pool, &normalized.root)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to store transaction: {}", e)))?;

    for child in &normalized.children {
        if let Err(e) = db::insert_span(&state.pool, child).await {
            tracing::warn!("Failed to insert child span {}: {}", child.span_id, e);
        }
    }

    if let Some(error) = normalized.error {
        if project.quota_exceeded() {
            tracing::debug!(
                "Dropping transaction-carried error for project {}: quota exceeded",
                project.id
            );
        } else {
            enqueue(state, project, error).await?;
        }
    }

    Ok(normalized.root.span_id.clone())
}

/// POST /api/:project_id/envelope - newline-delimited Sentry envelope
pub async fn store_envelope(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    authorize_project(&state, &project_id, &headers, &params).await?;

    let project = db::get_project(&state.pool, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    // The IP policy guards the whole envelope; the quota is applied per
    // error item below, since spans are counted but never rejected by it
    let policy = db::get_security_policy(&state.pool, &project.id).await?;
    let ip = client_ip(&headers, remote);
    if !policy.allows(&ip) {
        return Err(AppError::Forbidden(
            "Security policy violation: IP not allowed".to_string(),
        ));
    }

    let envelope = parse_envelope(&body);

    for item in &envelope.items {
        match item.header.item_type.as_str() {
            "transaction" => {
                let tx: WireTransaction = match serde_json::from_slice(&item.payload) {
                    Ok(tx) => tx,
                    Err(e) => {
                        tracing::warn!("Failed to parse envelope transaction: {}", e);
                        continue;
                    }
                };
                if let Err(e) = store_transaction(&state, &project, tx).await {
                    tracing::warn!("Failed to store envelope transaction: {:?}", e);
                }
            }
            "event" => {
                let wire: WireEvent = match serde_json::from_slice(&item.payload) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("Failed to parse envelope event: {}", e);
                        continue;
                    }
                };
                if project.quota_exceeded() {
                    tracing::debug!(
                        "Dropping envelope event for project {}: quota exceeded",
                        project.id
                    );
                    continue;
                }
                let event = ingest::normalize_event(&project.id, wire);
                enqueue(&state, &project, event).await?;
            }
            other => {
                tracing::debug!("Skipping envelope item of type '{}'", other);
            }
        }
    }

    let id = if envelope.header.event_id.is_empty() {
        "accepted".to_string()
    } else {
        envelope.header.event_id.clone()
    };

    Ok((StatusCode::ACCEPTED, Json(IngestResponse { id })))
}

#[derive(Debug, Deserialize)]
struct CoverageJson {
    coverage: f64,
}

/// POST /api/:project_id/coverage - multipart report file or bare percentage
pub async fn upload_coverage(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    request: Request,
) -> Result<StatusCode, AppError> {
    authorize_project(&state, &project_id, &headers, &params).await?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let (percentage, files) = if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| AppError::BadRequest("Failed to parse multipart form".to_string()))?;

        let mut parsed = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| AppError::BadRequest("Failed to parse multipart form".to_string()))?
        {
            if field.name() != Some("file") {
                continue;
            }
            let filename = field.file_name().unwrap_or_default().to_string();
            let format = coverage::detect_format(&filename).ok_or_else(|| {
                AppError::BadRequest(
                    "Unsupported coverage format. Use .out for Go or .info for LCOV".to_string(),
                )
            })?;
            let text = field
                .text()
                .await
                .map_err(|_| AppError::BadRequest("Failed to read coverage file".to_string()))?;
            parsed = Some(coverage::parse(format, &text));
            break;
        }

        parsed.ok_or_else(|| AppError::BadRequest("Missing 'file' in multipart form".to_string()))?
    } else {
        let body = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
            .await
            .map_err(|_| AppError::BadRequest("Failed to read request body".to_string()))?;
        let req: CoverageJson = serde_json::from_slice(&body)
            .map_err(|_| AppError::BadRequest("Invalid request body".to_string()))?;
        (req.coverage, Vec::new())
    };

    db::update_project_coverage(&state.pool, &project_id, percentage, &files).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/:project_id/ - minimal project info for SDK discovery
pub async fn project_discovery(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let project = db::get_project(&state.pool, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "id": project.id,
        "name": project.name,
    })))
}
