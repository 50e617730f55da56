//! Normalization of wire shapes into the domain model

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{ErrorEvent, ErrorStatus, TraceSpan};
use crate::protocol::{ExceptionList, FlexMessage, StoreRequest, WireEvent, WireTransaction};

use super::fingerprint;

/// A transaction normalized into its span tree, plus the error event carried
/// by the transaction payload when its exception list is non-empty
#[derive(Debug)]
pub struct NormalizedTransaction {
    pub root: TraceSpan,
    pub children: Vec<TraceSpan>,
    pub error: Option<ErrorEvent>,
}

impl NormalizedTransaction {
    /// All spans, root first
    pub fn spans(&self) -> impl Iterator<Item = &TraceSpan> {
        std::iter::once(&self.root).chain(self.children.iter())
    }
}

/// Normalize a Sentry error event
pub fn normalize_event(project_id: &str, event: WireEvent) -> ErrorEvent {
    let message = extract_message(&event.message, &event.exception);
    let stacktrace = select_stacktrace(&event.exception, &event.stacktrace);
    let context = coalesce_context(&event.contexts, &event.extra, &event.sdk);
    let level = event.level.parse().unwrap_or_default();
    let now = Utc::now();

    let trace_id = event
        .contexts
        .as_ref()
        .and_then(|c| c.get("trace"))
        .and_then(|t| t.get("trace_id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut normalized = ErrorEvent {
        id: reuse_or_generate(&event.event_id),
        project_id: project_id.to_string(),
        message,
        level,
        environment: event.environment,
        release: event.release,
        platform: event.platform,
        timestamp: event.timestamp.map(Into::into).unwrap_or(now),
        stacktrace,
        context,
        user: to_opaque(&event.user),
        tags: to_opaque(&event.tags),
        status: ErrorStatus::Unresolved,
        fingerprint: String::new(),
        trace_id,
        created_at: now,
    };
    normalized.fingerprint = fingerprint(
        &normalized.message,
        &normalized.level.to_string(),
        &normalized.platform,
        &normalized.stacktrace,
    );
    normalized
}

/// Normalize a transaction into a root span, child spans, and (when the
/// payload also carries exceptions) an error event
pub fn normalize_transaction(project_id: &str, tx: WireTransaction) -> NormalizedTransaction {
    let now = Utc::now();
    let trace = &tx.contexts.trace;

    let mut root = TraceSpan::new(project_id);
    root.trace_id = reuse_or_generate(&trace.trace_id);
    root.span_id = reuse_or_generate(&trace.span_id);
    root.parent_span_id = trace.parent_span_id.clone();
    root.name = if tx.transaction.is_empty() {
        "transaction".to_string()
    } else {
        tx.transaction.clone()
    };
    root.op = if trace.op.is_empty() {
        "transaction".to_string()
    } else {
        trace.op.clone()
    };
    root.description = tx.transaction.clone();
    root.start_timestamp = tx.start_timestamp.map(Into::into).unwrap_or(now);
    root.timestamp = tx.timestamp.map(Into::into).unwrap_or(now);
    root.status = trace.status.clone();

    let children = tx
        .spans
        .iter()
        .map(|s| {
            let mut child = TraceSpan::new(project_id);
            child.span_id = reuse_or_generate(&s.span_id);
            child.trace_id = if s.trace_id.is_empty() {
                root.trace_id.clone()
            } else {
                s.trace_id.clone()
            };
            child.parent_span_id = if s.parent_span_id.is_empty() {
                root.span_id.clone()
            } else {
                s.parent_span_id.clone()
            };
            child.name = s.description.clone();
            child.op = s.op.clone();
            child.description = s.description.clone();
            child.start_timestamp = s.start_timestamp.map(Into::into).unwrap_or(now);
            child.timestamp = s.timestamp.map(Into::into).unwrap_or(now);
            child.status = s.status.clone();
            child.data = to_opaque(&s.data);
            child
        })
        .collect();

    let error = tx
        .exception
        .as_ref()
        .filter(|e| !e.is_empty())
        .map(|exception| {
            let message = extract_message(&None, &Some(exception.clone()));
            let stacktrace = select_stacktrace(&tx.exception, &None);
            let mut event = ErrorEvent {
                id: Uuid::new_v4().to_string(),
                project_id: project_id.to_string(),
                message,
                level: tx.level.parse().unwrap_or_default(),
                environment: tx.environment.clone(),
                release: tx.release.clone(),
                platform: tx.platform.clone(),
                timestamp: tx.timestamp.map(Into::into).unwrap_or(now),
                stacktrace,
                context: "{}".to_string(),
                user: "{}".to_string(),
                tags: "{}".to_string(),
                status: ErrorStatus::Unresolved,
                fingerprint: String::new(),
                trace_id: root.trace_id.clone(),
                created_at: now,
            };
            event.fingerprint = fingerprint(
                &event.message,
                &event.level.to_string(),
                &event.platform,
                &event.stacktrace,
            );
            event
        });

    NormalizedTransaction {
        root,
        children,
        error,
    }
}

/// Normalize the flat legacy store shape
pub fn normalize_store_request(project_id: &str, req: StoreRequest) -> ErrorEvent {
    let now = Utc::now();
    let stacktrace = to_opaque(&req.stacktrace);
    let level = req.level.parse().unwrap_or_default();

    let mut event = ErrorEvent {
        id: Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        message: req.message,
        level,
        environment: req.environment,
        release: req.release,
        platform: req.platform,
        timestamp: req.timestamp.map(Into::into).unwrap_or(now),
        stacktrace,
        context: to_opaque(&req.context),
        user: to_opaque(&req.user),
        tags: to_opaque(&req.tags),
        status: ErrorStatus::Unresolved,
        fingerprint: String::new(),
        trace_id: String::new(),
        created_at: now,
    };
    event.fingerprint = fingerprint(
        &event.message,
        &event.level.to_string(),
        &event.platform,
        &event.stacktrace,
    );
    event
}

/// First non-empty of: the message field, the first exception formatted as
/// `"Type: value"`. Substitutes `"Unknown error"` when everything is empty.
fn extract_message(message: &Option<FlexMessage>, exception: &Option<ExceptionList>) -> String {
    if let Some(text) = message.as_ref().and_then(|m| m.resolve()) {
        return text.to_string();
    }

    if let Some(first) = exception.as_ref().and_then(|e| e.first()) {
        if !first.exception_type.is_empty() {
            return format!("{}: {}", first.exception_type, first.value);
        }
        if !first.value.is_empty() {
            return first.value.clone();
        }
    }

    "Unknown error".to_string()
}

/// The first exception's stacktrace, else the top-level one, else `{}`
fn select_stacktrace(exception: &Option<ExceptionList>, top_level: &Option<Value>) -> String {
    if let Some(trace) = exception
        .as_ref()
        .and_then(|e| e.first())
        .and_then(|v| v.stacktrace.as_ref())
    {
        return to_opaque(&Some(trace.clone()));
    }
    to_opaque(top_level)
}

/// Merge `contexts`, `extra`, and `sdk` into one opaque blob
fn coalesce_context(
    contexts: &Option<Value>,
    extra: &Option<Value>,
    sdk: &Option<Value>,
) -> String {
    let mut merged = serde_json::Map::new();
    if let Some(contexts) = contexts {
        merged.insert("contexts".to_string(), contexts.clone());
    }
    if let Some(extra) = extra {
        merged.insert("extra".to_string(), extra.clone());
    }
    if let Some(sdk) = sdk {
        merged.insert("sdk".to_string(), sdk.clone());
    }
    Value::Object(merged).to_string()
}

fn to_opaque(value: &Option<Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "{}".to_string(),
    }
}

fn reuse_or_generate(id: &str) -> String {
    if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Level;

    #[test]
    fn test_normalize_plain_event() {
        let wire: WireEvent = serde_json::from_str(
            r#"{"event_id":"abc","message":"boom","level":"warning","platform":"python","environment":"prod"}"#,
        )
        .unwrap();
        let event = normalize_event("p1", wire);

        assert_eq!(event.id, "abc");
        assert_eq!(event.message, "boom");
        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.platform, "python");
        assert_eq!(event.environment, "prod");
        assert_eq!(event.status, ErrorStatus::Unresolved);
        assert_eq!(event.fingerprint.len(), 16);
    }

    #[test]
    fn test_exception_as_array_builds_message_and_stacktrace() {
        let wire: WireEvent = serde_json::from_str(
            r#"{
                "event_id": "abc",
                "exception": [{"type":"E","value":"v","stacktrace":{"frames":[{"filename":"f","function":"g","lineno":10}]}}],
                "level": "error",
                "platform": "js"
            }"#,
        )
        .unwrap();
        let event = normalize_event("p1", wire);

        assert_eq!(event.message, "E: v");
        let stored: Value = serde_json::from_str(&event.stacktrace).unwrap();
        assert_eq!(stored["frames"][0]["filename"], "f");
        assert_eq!(event.fingerprint.len(), 16);
    }

    #[test]
    fn test_message_object_formatted() {
        let wire: WireEvent =
            serde_json::from_str(r#"{"message":{"formatted":"got 3 errors"}}"#).unwrap();
        let event = normalize_event("p1", wire);
        assert_eq!(event.message, "got 3 errors");
    }

    #[test]
    fn test_unknown_error_substitution() {
        let wire: WireEvent = serde_json::from_str(r#"{"event_id":"x"}"#).unwrap();
        let event = normalize_event("p1", wire);
        assert_eq!(event.message, "Unknown error");
    }

    #[test]
    fn test_level_defaults_to_error() {
        let wire: WireEvent = serde_json::from_str(r#"{"message":"m"}"#).unwrap();
        assert_eq!(normalize_event("p1", wire).level, Level::Error);
    }

    #[test]
    fn test_context_coalescing() {
        let wire: WireEvent = serde_json::from_str(
            r#"{"message":"m","contexts":{"os":{"name":"linux"}},"extra":{"k":1},"sdk":{"name":"sentry.python"}}"#,
        )
        .unwrap();
        let event = normalize_event("p1", wire);
        let context: Value = serde_json::from_str(&event.context).unwrap();

        assert_eq!(context["contexts"]["os"]["name"], "linux");
        assert_eq!(context["extra"]["k"], 1);
        assert_eq!(context["sdk"]["name"], "sentry.python");
    }

    #[test]
    fn test_trace_id_lifted_from_contexts() {
        let wire: WireEvent = serde_json::from_str(
            r#"{"message":"m","contexts":{"trace":{"trace_id":"T9"}}}"#,
        )
        .unwrap();
        assert_eq!(normalize_event("p1", wire).trace_id, "T9");
    }

    #[test]
    fn test_missing_event_id_is_generated() {
        let wire: WireEvent = serde_json::from_str(r#"{"message":"m"}"#).unwrap();
        let event = normalize_event("p1", wire);
        assert!(uuid::Uuid::parse_str(&event.id).is_ok());
    }

    fn sample_transaction() -> WireTransaction {
        serde_json::from_str(
            r#"{
                "event_id": "1",
                "transaction": "GET /checkout",
                "contexts": {"trace": {"trace_id": "T", "span_id": "S", "op": "http"}},
                "spans": [
                    {"span_id": "c1", "description": "SELECT users", "op": "db"},
                    {"span_id": "c2", "description": "render", "op": "template", "trace_id": "T", "parent_span_id": "c1"}
                ],
                "start_timestamp": 1700000000.0,
                "timestamp": 1700000001.5
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_transaction_root_span() {
        let normalized = normalize_transaction("p1", sample_transaction());
        let root = &normalized.root;

        assert_eq!(root.trace_id, "T");
        assert_eq!(root.span_id, "S");
        assert_eq!(root.parent_span_id, "");
        assert!(root.is_root());
        assert_eq!(root.name, "GET /checkout");
        assert_eq!(root.op, "http");
        assert_eq!(root.duration_ms(), 1500);
    }

    #[test]
    fn test_transaction_children_inherit() {
        let normalized = normalize_transaction("p1", sample_transaction());
        let children = &normalized.children;

        assert_eq!(children.len(), 2);
        // c1 had no trace_id or parent: inherits both from the root
        assert_eq!(children[0].trace_id, "T");
        assert_eq!(children[0].parent_span_id, "S");
        // c2 carried its own parent
        assert_eq!(children[1].parent_span_id, "c1");
        assert!(normalized.error.is_none());
    }

    #[test]
    fn test_transaction_missing_ids_are_generated() {
        let tx: WireTransaction = serde_json::from_str(r#"{"transaction":"t"}"#).unwrap();
        let normalized = normalize_transaction("p1", tx);

        assert!(!normalized.root.trace_id.is_empty());
        assert!(!normalized.root.span_id.is_empty());
        assert_eq!(normalized.root.op, "transaction");
    }

    #[test]
    fn test_transaction_carrying_exception_emits_error() {
        let tx: WireTransaction = serde_json::from_str(
            r#"{
                "transaction": "job",
                "contexts": {"trace": {"trace_id": "T", "span_id": "S"}},
                "exception": [{"value": "oops"}]
            }"#,
        )
        .unwrap();
        let normalized = normalize_transaction("p1", tx);

        assert_eq!(normalized.spans().count(), 1);
        let error = normalized.error.expect("expected an error event");
        assert!(error.message.contains("oops"));
        assert_eq!(error.trace_id, "T");
    }

    #[test]
    fn test_normalize_store_request() {
        let req: StoreRequest = serde_json::from_str(
            r#"{"message":"boom","level":"error","platform":"python"}"#,
        )
        .unwrap();
        let event = normalize_store_request("p1", req);

        assert_eq!(event.message, "boom");
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.platform, "python");
        assert_eq!(event.fingerprint.len(), 16);
    }
}
