//! Wire shapes for events, transactions, and spans

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::FlexTimestamp;

/// A message that may be a plain string or an object with
/// `formatted`/`message` fields
#[derive(Debug, Clone)]
pub enum FlexMessage {
    Text(String),
    Object {
        formatted: Option<String>,
        message: Option<String>,
    },
}

impl FlexMessage {
    /// First non-empty of: the string form, `formatted`, `message`
    pub fn resolve(&self) -> Option<&str> {
        let text = match self {
            FlexMessage::Text(s) => Some(s.as_str()),
            FlexMessage::Object { formatted, message } => formatted
                .as_deref()
                .filter(|s| !s.is_empty())
                .or(message.as_deref()),
        };
        text.filter(|s| !s.is_empty())
    }
}

impl<'de> Deserialize<'de> for FlexMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object {
                #[serde(default)]
                formatted: Option<String>,
                #[serde(default)]
                message: Option<String>,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => FlexMessage::Text(s),
            Raw::Object { formatted, message } => FlexMessage::Object { formatted, message },
        })
    }
}

/// One entry of an exception chain
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExceptionValue {
    #[serde(default, rename = "type")]
    pub exception_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub mechanism: Option<Value>,
    #[serde(default)]
    pub stacktrace: Option<Value>,
}

/// An exception field that may be `{"values": [...]}` or a bare array
#[derive(Debug, Clone, Default)]
pub struct ExceptionList {
    pub values: Vec<ExceptionValue>,
}

impl ExceptionList {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<&ExceptionValue> {
        self.values.first()
    }
}

impl<'de> Deserialize<'de> for ExceptionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Wrapped { values: Vec<ExceptionValue> },
            Bare(Vec<ExceptionValue>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Wrapped { values } => ExceptionList { values },
            Raw::Bare(values) => ExceptionList { values },
        })
    }
}

/// A Sentry error event as received on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub message: Option<FlexMessage>,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub exception: Option<ExceptionList>,
    #[serde(default)]
    pub stacktrace: Option<Value>,
    #[serde(default)]
    pub sdk: Option<Value>,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub timestamp: Option<FlexTimestamp>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub contexts: Option<Value>,
    #[serde(default)]
    pub extra: Option<Value>,
}

/// The `contexts` block of a transaction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireContexts {
    #[serde(default)]
    pub trace: WireTraceContext,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireTraceContext {
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default)]
    pub parent_span_id: String,
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub status: String,
}

/// A Sentry transaction as received on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireTransaction {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub contexts: WireContexts,
    #[serde(default)]
    pub spans: Vec<WireSpan>,
    #[serde(default)]
    pub start_timestamp: Option<FlexTimestamp>,
    #[serde(default)]
    pub timestamp: Option<FlexTimestamp>,
    /// Errors observed during the transaction; emitted as an ErrorEvent
    /// alongside the span tree
    #[serde(default)]
    pub exception: Option<ExceptionList>,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub platform: String,
}

/// One child span of a transaction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireSpan {
    #[serde(default)]
    pub span_id: String,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub parent_span_id: String,
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_timestamp: Option<FlexTimestamp>,
    #[serde(default)]
    pub timestamp: Option<FlexTimestamp>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// The flat event shape accepted by the legacy `/api/store` endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub timestamp: Option<FlexTimestamp>,
    #[serde(default)]
    pub stacktrace: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
}
