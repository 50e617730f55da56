//! Ingestion credential extraction
//!
//! Clients present their project API key through one of several mechanisms,
//! tried in priority order:
//!
//! 1. `X-Sentry-Auth` header, `sentry_key` field of the comma-separated list
//! 2. `X-Pulse-Auth` header (raw key)
//! 3. `Authorization: Bearer <key>`
//! 4. `Authorization: Basic <base64(key:secret)>` (key before the colon)
//! 5. `sentry_key` query parameter

use axum::http::HeaderMap;
use base64::Engine;

/// Extract the API key from request headers and the optional `sentry_key`
/// query parameter. Returns `None` when no mechanism yields a key.
pub fn extract_api_key(headers: &HeaderMap, sentry_key_param: Option<&str>) -> Option<String> {
    if let Some(key) = headers
        .get("x-sentry-auth")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_sentry_auth)
    {
        return Some(key);
    }

    if let Some(key) = headers.get("x-pulse-auth").and_then(|v| v.to_str().ok()) {
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        } else if let Some(encoded) = auth.strip_prefix("Basic ") {
            if let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded) {
                let decoded = String::from_utf8_lossy(&decoded);
                let key = decoded.split(':').next().unwrap_or_default();
                if !key.is_empty() {
                    return Some(key.to_string());
                }
            }
        }
    }

    sentry_key_param
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

/// Pull `sentry_key` out of an `X-Sentry-Auth` value, e.g.
/// `Sentry sentry_key=abc, sentry_version=7`
fn parse_sentry_auth(header: &str) -> Option<String> {
    for part in header.split(',') {
        if let Some(idx) = part.find("sentry_key=") {
            let key = part[idx + "sentry_key=".len()..].trim();
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
    }
    None
}

/// Client IP for policy checks: `X-Forwarded-For` when present, otherwise
/// the connection's remote address
pub fn client_ip(headers: &HeaderMap, remote_addr: std::net::SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| remote_addr.ip().to_string())
}
