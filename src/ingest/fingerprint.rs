//! Stable error fingerprinting
//!
//! The fingerprint is the group key: a short hash over message, level,
//! platform, and the innermost three stack frames. Grouping itself is a pure
//! query-time derivation over stored rows.

use serde_json::Value;
use sha2::{Digest, Sha256};

const FRAME_COUNT: usize = 3;

/// Compute the 16-hex-char fingerprint for an error
///
/// Frames are taken from `stacktrace.frames`, iterating from the end of the
/// array backwards (the innermost frames); for each, `filename`, `function`,
/// and `lineno` are appended when present. All parts are joined with `|`
/// before hashing.
pub fn fingerprint(message: &str, level: &str, platform: &str, stacktrace_json: &str) -> String {
    let mut parts: Vec<String> = vec![
        message.to_string(),
        level.to_string(),
        platform.to_string(),
    ];

    let stacktrace: Value = serde_json::from_str(stacktrace_json).unwrap_or(Value::Null);
    if let Some(frames) = stacktrace.get("frames").and_then(Value::as_array) {
        if !frames.is_empty() {
            let count = frames.len().min(FRAME_COUNT);
            for frame in frames.iter().rev().take(count) {
                if let Some(filename) = frame.get("filename").and_then(Value::as_str) {
                    parts.push(filename.to_string());
                }
                if let Some(function) = frame.get("function").and_then(Value::as_str) {
                    parts.push(function.to_string());
                }
                if let Some(lineno) = frame.get("lineno").and_then(Value::as_f64) {
                    parts.push(format!("{}", lineno as i64));
                }
            }
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}
