//! OTLP trace data model, serialized with the protobuf-JSON mapping
//!
//! Field names are lowerCamelCase, bytes are standard base64, 64-bit integers
//! are decimal strings, enums are their integer values and fields holding a
//! default value are omitted.

use serde::Serialize;

/// Envelope written by the gateway for trace responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayEnvelope {
    pub result: TracesData,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TracesData {
    pub resource_spans: Vec<ResourceSpans>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpans {
    pub resource: Resource,
    pub scope_spans: Vec<ScopeSpans>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSpans {
    pub scope: InstrumentationScope,
    pub spans: Vec<Span>,
}

/// Always empty: the storage model has no instrumentation scope
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InstrumentationScope {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(with = "base64_bytes")]
    pub trace_id: [u8; 16],
    #[serde(with = "base64_bytes")]
    pub span_id: [u8; 8],
    #[serde(skip_serializing_if = "Option::is_none", with = "base64_option")]
    pub parent_span_id: Option<[u8; 8]>,
    #[serde(skip_serializing_if = "is_zero")]
    pub flags: u32,
    pub name: String,
    #[serde(skip_serializing_if = "is_zero_i32")]
    pub kind: i32,
    #[serde(with = "u64_string")]
    pub start_time_unix_nano: u64,
    #[serde(with = "u64_string")]
    pub end_time_unix_nano: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Status::is_unset")]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(with = "u64_string")]
    pub time_unix_nano: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(with = "base64_bytes")]
    pub trace_id: [u8; 16],
    #[serde(with = "base64_bytes")]
    pub span_id: [u8; 8],
}

/// The `Status.StatusCode` values a stored span can map to; storage has
/// no notion of an explicit OK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCode {
    #[default]
    Unset = 0,
    Error = 2,
}

/// Span status. Storage carries no status message, so only the code is written.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Status {
    #[serde(serialize_with = "status_code_int")]
    pub code: StatusCode,
}

impl Status {
    pub fn error() -> Self {
        Self {
            code: StatusCode::Error,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.code == StatusCode::Unset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

/// `AnyValue` oneof; the externally tagged enum gives `{"stringValue": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnyValue {
    StringValue(String),
    BoolValue(bool),
    IntValue(#[serde(serialize_with = "i64_string")] i64),
    DoubleValue(#[serde(serialize_with = "f64_json")] f64),
    BytesValue(#[serde(serialize_with = "base64_bytes::serialize")] Vec<u8>),
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

fn status_code_int<S: serde::Serializer>(code: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i32(*code as i32)
}

/// Finite doubles are JSON numbers; NaN and the infinities use the
/// protobuf-JSON string spellings
fn f64_json<S: serde::Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    if v.is_nan() {
        s.serialize_str("NaN")
    } else if v.is_infinite() {
        s.serialize_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        s.serialize_f64(*v)
    }
}

fn i64_string<S: serde::Serializer>(v: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(v)
}

mod u64_string {
    pub fn serialize<S: serde::Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    pub fn serialize<S, T>(bytes: &T, s: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: AsRef<[u8]>,
    {
        s.serialize_str(&STANDARD.encode(bytes.as_ref()))
    }
}

mod base64_option {
    pub fn serialize<S: serde::Serializer>(bytes: &Option<[u8; 8]>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => super::base64_bytes::serialize(b, s),
            None => s.serialize_none(),
        }
    }
}
