//! Storage-side trace model
//!
//! This is the shape spans have when they come back from a [`SpanReader`].
//! The gateway never mutates these values; it only projects them.
//!
//! [`SpanReader`]: crate::storage::SpanReader

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::ids::{SpanId, TraceId};

/// Tag key carrying the span kind in the storage model
pub const SPAN_KIND_TAG: &str = "span.kind";
/// Tag key carrying the error flag in the storage model
pub const ERROR_TAG: &str = "error";

/// Role of a span in a distributed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Unspecified => "unspecified",
            SpanKind::Internal => "internal",
            SpanKind::Server => "server",
            SpanKind::Client => "client",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unspecified" => Some(SpanKind::Unspecified),
            "internal" => Some(SpanKind::Internal),
            "server" => Some(SpanKind::Server),
            "client" => Some(SpanKind::Client),
            "producer" => Some(SpanKind::Producer),
            "consumer" => Some(SpanKind::Consumer),
            _ => None,
        }
    }

    /// OTLP `Span.SpanKind` enum value
    pub fn to_otlp(&self) -> i32 {
        match self {
            SpanKind::Unspecified => 0,
            SpanKind::Internal => 1,
            SpanKind::Server => 2,
            SpanKind::Client => 3,
            SpanKind::Producer => 4,
            SpanKind::Consumer => 5,
        }
    }
}

/// Typed tag value
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    String(String),
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Binary(Vec<u8>),
    /// A value whose type tag this gateway does not understand. Kept so the
    /// translator can reject the whole response instead of dropping it.
    Unsupported(String),
}

impl TagValue {
    pub fn type_name(&self) -> &str {
        match self {
            TagValue::String(_) => "string",
            TagValue::Bool(_) => "bool",
            TagValue::Int64(_) => "int64",
            TagValue::Float64(_) => "float64",
            TagValue::Binary(_) => "binary",
            TagValue::Unsupported(name) => name,
        }
    }

    /// String rendering used for tag filter matching
    pub fn as_string(&self) -> String {
        match self {
            TagValue::String(s) => s.clone(),
            TagValue::Bool(b) => b.to_string(),
            TagValue::Int64(i) => i.to_string(),
            TagValue::Float64(f) => f.to_string(),
            TagValue::Binary(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            TagValue::Unsupported(_) => String::new(),
        }
    }
}

/// Key plus typed value, used for span tags, process tags and log fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawKeyValue", into = "RawKeyValue")]
pub struct KeyValue {
    pub key: String,
    pub value: TagValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: TagValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, TagValue::String(value.into()))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, TagValue::Bool(value))
    }

    pub fn int64(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, TagValue::Int64(value))
    }

    pub fn float64(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, TagValue::Float64(value))
    }

    pub fn binary(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::new(key, TagValue::Binary(value))
    }
}

/// Stored JSON form: `{"key": "...", "type": "int64", "value": 42}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawKeyValue {
    key: String,
    #[serde(rename = "type")]
    value_type: String,
    #[serde(default)]
    value: serde_json::Value,
}

impl TryFrom<RawKeyValue> for KeyValue {
    type Error = String;

    fn try_from(raw: RawKeyValue) -> Result<Self, Self::Error> {
        let mismatch = || {
            format!(
                "tag '{}': value does not match type '{}'",
                raw.key, raw.value_type
            )
        };

        let value = match raw.value_type.as_str() {
            "string" => TagValue::String(raw.value.as_str().ok_or_else(mismatch)?.to_string()),
            "bool" => TagValue::Bool(raw.value.as_bool().ok_or_else(mismatch)?),
            "int64" => {
                let parsed = match &raw.value {
                    serde_json::Value::String(s) => s.parse().ok(),
                    other => other.as_i64(),
                };
                TagValue::Int64(parsed.ok_or_else(mismatch)?)
            }
            "float64" => TagValue::Float64(raw.value.as_f64().ok_or_else(mismatch)?),
            "binary" => {
                let encoded = raw.value.as_str().ok_or_else(mismatch)?;
                TagValue::Binary(STANDARD.decode(encoded).map_err(|_| mismatch())?)
            }
            other => TagValue::Unsupported(other.to_string()),
        };

        Ok(KeyValue {
            key: raw.key,
            value,
        })
    }
}

impl From<KeyValue> for RawKeyValue {
    fn from(kv: KeyValue) -> Self {
        let value_type = kv.value.type_name().to_string();
        let value = match kv.value {
            TagValue::String(s) => serde_json::Value::String(s),
            TagValue::Bool(b) => serde_json::Value::Bool(b),
            TagValue::Int64(i) => serde_json::json!(i),
            TagValue::Float64(f) => serde_json::json!(f),
            TagValue::Binary(bytes) => serde_json::Value::String(STANDARD.encode(bytes)),
            TagValue::Unsupported(_) => serde_json::Value::Null,
        };
        RawKeyValue {
            key: kv.key,
            value_type,
            value,
        }
    }
}

/// The service instance that emitted a span
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Process {
    pub service_name: String,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
}

impl Process {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<KeyValue>) -> Self {
        self.tags = tags;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    ChildOf,
    FollowsFrom,
}

/// Causal link to another span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRef {
    pub ref_type: RefType,
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

/// Timestamped structured log attached to a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// Microseconds since the Unix epoch
    pub timestamp: u64,
    #[serde(default)]
    pub fields: Vec<KeyValue>,
}

/// A single unit of work as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub operation_name: String,
    #[serde(default)]
    pub references: Vec<SpanRef>,
    #[serde(default)]
    pub flags: u32,
    /// Microseconds since the Unix epoch
    #[serde(default)]
    pub start_time: u64,
    /// Microseconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(default)]
    pub process: Process,
}

impl Span {
    pub fn new(trace_id: TraceId, span_id: SpanId, operation_name: impl Into<String>) -> Self {
        Self {
            trace_id,
            span_id,
            operation_name: operation_name.into(),
            references: Vec::new(),
            flags: 0,
            start_time: 0,
            duration: 0,
            tags: Vec::new(),
            logs: Vec::new(),
            process: Process::default(),
        }
    }

    /// Kind as recorded in the `span.kind` tag; unspecified when absent or
    /// unrecognised.
    pub fn kind(&self) -> SpanKind {
        self.tags
            .iter()
            .find(|kv| kv.key == SPAN_KIND_TAG)
            .and_then(|kv| match &kv.value {
                TagValue::String(s) => SpanKind::parse(s),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Index into `references` of the parent: the first CHILD_OF reference
    /// within the same trace
    pub fn parent_ref_index(&self) -> Option<usize> {
        self.references
            .iter()
            .position(|r| r.ref_type == RefType::ChildOf && r.trace_id == self.trace_id)
    }

    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.parent_ref_index().map(|i| self.references[i].span_id)
    }

    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }
}

/// Spans sharing one trace id, in storage order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trace {
    pub spans: Vec<Span>,
}

impl Trace {
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    pub fn trace_id(&self) -> Option<TraceId> {
        self.spans.first().map(|s| s.trace_id)
    }

    /// Earliest span start, used for newest-first ordering of search results
    pub fn start_time(&self) -> u64 {
        self.spans.iter().map(|s| s.start_time).min().unwrap_or(0)
    }
}

/// An operation a service is known to perform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub span_kind: SpanKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_kind_parse() {
        assert_eq!(SpanKind::parse("server"), Some(SpanKind::Server));
        assert_eq!(SpanKind::parse("unspecified"), Some(SpanKind::Unspecified));
        assert_eq!(SpanKind::parse("SERVER"), None);
        assert_eq!(SpanKind::Consumer.to_otlp(), 5);
    }

    #[test]
    fn test_span_kind_from_tag() {
        let mut span = Span::new(TraceId::new(0, 1), SpanId::new(2), "op");
        assert_eq!(span.kind(), SpanKind::Unspecified);

        span.tags.push(KeyValue::string(SPAN_KIND_TAG, "client"));
        assert_eq!(span.kind(), SpanKind::Client);

        span.tags[0] = KeyValue::string(SPAN_KIND_TAG, "sideways");
        assert_eq!(span.kind(), SpanKind::Unspecified);
    }

    #[test]
    fn test_parent_span_id_ignores_other_traces() {
        let trace_id = TraceId::new(0, 1);
        let mut span = Span::new(trace_id, SpanId::new(3), "op");
        span.references = vec![
            SpanRef {
                ref_type: RefType::ChildOf,
                trace_id: TraceId::new(9, 9),
                span_id: SpanId::new(7),
            },
            SpanRef {
                ref_type: RefType::FollowsFrom,
                trace_id,
                span_id: SpanId::new(8),
            },
            SpanRef {
                ref_type: RefType::ChildOf,
                trace_id,
                span_id: SpanId::new(2),
            },
        ];
        assert_eq!(span.parent_span_id(), Some(SpanId::new(2)));
    }

    #[test]
    fn test_key_value_json() {
        let kv: KeyValue =
            serde_json::from_str(r#"{"key": "http.status_code", "type": "int64", "value": 200}"#)
                .unwrap();
        assert_eq!(kv, KeyValue::int64("http.status_code", 200));

        let kv: KeyValue =
            serde_json::from_str(r#"{"key": "blob", "type": "binary", "value": "AQID"}"#).unwrap();
        assert_eq!(kv.value, TagValue::Binary(vec![1, 2, 3]));

        let kv: KeyValue =
            serde_json::from_str(r#"{"key": "x", "type": "decimal128", "value": "1.0"}"#).unwrap();
        assert_eq!(kv.value, TagValue::Unsupported("decimal128".to_string()));

        let err = serde_json::from_str::<KeyValue>(r#"{"key": "x", "type": "bool", "value": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_tag_value_as_string() {
        assert_eq!(TagValue::Bool(true).as_string(), "true");
        assert_eq!(TagValue::Int64(-4).as_string(), "-4");
        assert_eq!(TagValue::Binary(vec![0x0a, 0xff]).as_string(), "0aff");
    }
}
