//! Storage trace model -> OTLP ResourceSpans tree
//!
//! Spans are grouped per trace by their owning process (service name plus
//! process tags). Each group becomes one `ResourceSpans` with a single empty
//! scope. Span order inside a group is the storage order.
//!
//! Translation is all-or-nothing: one bad tag anywhere fails the whole
//! result.

use fxhash::FxHashMap;

use super::model::{
    AnyValue, Event, InstrumentationScope, KeyValue as OtlpKeyValue, Link, Resource,
    ResourceSpans, ScopeSpans, Span as OtlpSpan, Status, TracesData,
};
use crate::model::{
    KeyValue, Log, Process, Span, SpanKind, TagValue, Trace, ERROR_TAG, SPAN_KIND_TAG,
};

/// Resource attribute holding the service name
pub const SERVICE_NAME_KEY: &str = "service.name";
/// Log field used as the OTLP event name
const EVENT_NAME_FIELD: &str = "event";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("tag '{key}' has unsupported type '{type_name}'")]
    UnsupportedTagType { key: String, type_name: String },
}

/// Identity of a resource: service name plus the process tags, sorted by key
/// so tag order does not split a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResourceKey {
    service_name: String,
    tags: Vec<(String, String)>,
}

impl ResourceKey {
    fn of(process: &Process) -> Self {
        let mut tags: Vec<(String, String)> = process
            .tags
            .iter()
            .filter(|kv| kv.key != SERVICE_NAME_KEY)
            .map(|kv| (kv.key.clone(), canonical_value(&kv.value)))
            .collect();
        tags.sort();
        Self {
            service_name: process.service_name.clone(),
            tags,
        }
    }
}

/// Exact, type-qualified rendering of a tag value for equality checks
fn canonical_value(value: &TagValue) -> String {
    match value {
        // Bit pattern keeps -0.0 / 0.0 and NaN payloads distinct
        TagValue::Float64(f) => format!("float64:{:016x}", f.to_bits()),
        other => format!("{}:{}", other.type_name(), other.as_string()),
    }
}

/// Translate a single trace
pub fn translate_trace(trace: &Trace) -> Result<Vec<ResourceSpans>, TranslateError> {
    let mut resources: Vec<ResourceSpans> = Vec::new();
    let mut index: FxHashMap<ResourceKey, usize> = FxHashMap::default();

    for span in &trace.spans {
        let key = ResourceKey::of(&span.process);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                resources.push(ResourceSpans {
                    resource: convert_resource(&span.process)?,
                    scope_spans: vec![ScopeSpans {
                        scope: InstrumentationScope::default(),
                        spans: Vec::new(),
                    }],
                });
                index.insert(key, resources.len() - 1);
                resources.len() - 1
            }
        };

        let converted = convert_span(span)?;
        resources[slot].scope_spans[0].spans.push(converted);
    }

    Ok(resources)
}

/// Translate several traces into one payload. Resource groups never span
/// traces, even for the same service.
pub fn translate_traces<'a, I>(traces: I) -> Result<TracesData, TranslateError>
where
    I: IntoIterator<Item = &'a Trace>,
{
    let mut resource_spans = Vec::new();
    for trace in traces {
        resource_spans.extend(translate_trace(trace)?);
    }
    Ok(TracesData { resource_spans })
}

fn convert_resource(process: &Process) -> Result<Resource, TranslateError> {
    let mut attributes = Vec::with_capacity(process.tags.len() + 1);
    attributes.push(OtlpKeyValue {
        key: SERVICE_NAME_KEY.to_string(),
        value: AnyValue::StringValue(process.service_name.clone()),
    });
    // The process service name owns the key
    for tag in process.tags.iter().filter(|t| t.key != SERVICE_NAME_KEY) {
        attributes.push(convert_key_value(tag)?);
    }
    Ok(Resource { attributes })
}

fn convert_span(span: &Span) -> Result<OtlpSpan, TranslateError> {
    let mut kind = SpanKind::Unspecified;
    let mut status = Status::default();
    let mut attributes = Vec::with_capacity(span.tags.len());

    for tag in &span.tags {
        match (tag.key.as_str(), &tag.value) {
            (SPAN_KIND_TAG, TagValue::String(s)) => match SpanKind::parse(s) {
                Some(parsed) => kind = parsed,
                None => attributes.push(convert_key_value(tag)?),
            },
            (ERROR_TAG, TagValue::Bool(is_error)) => {
                if *is_error {
                    status = Status::error();
                }
            }
            _ => attributes.push(convert_key_value(tag)?),
        }
    }

    let parent = span.parent_ref_index();
    let links = span
        .references
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != parent)
        .map(|(_, r)| Link {
            trace_id: r.trace_id.to_bytes(),
            span_id: r.span_id.to_bytes(),
        })
        .collect();

    let events = span
        .logs
        .iter()
        .map(convert_log)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(OtlpSpan {
        trace_id: span.trace_id.to_bytes(),
        span_id: span.span_id.to_bytes(),
        parent_span_id: parent.map(|i| span.references[i].span_id.to_bytes()),
        flags: span.flags,
        name: span.operation_name.clone(),
        kind: kind.to_otlp(),
        start_time_unix_nano: micros_to_nanos(span.start_time),
        end_time_unix_nano: micros_to_nanos(span.end_time()),
        attributes,
        events,
        links,
        status,
    })
}

fn convert_log(log: &Log) -> Result<Event, TranslateError> {
    let mut name = String::new();
    let mut attributes = Vec::with_capacity(log.fields.len());

    for field in &log.fields {
        match (&field.value, name.is_empty()) {
            (TagValue::String(s), true) if field.key == EVENT_NAME_FIELD => name = s.clone(),
            _ => attributes.push(convert_key_value(field)?),
        }
    }

    Ok(Event {
        time_unix_nano: micros_to_nanos(log.timestamp),
        name,
        attributes,
    })
}

fn convert_key_value(kv: &KeyValue) -> Result<OtlpKeyValue, TranslateError> {
    let value = match &kv.value {
        TagValue::String(s) => AnyValue::StringValue(s.clone()),
        TagValue::Bool(b) => AnyValue::BoolValue(*b),
        TagValue::Int64(i) => AnyValue::IntValue(*i),
        TagValue::Float64(f) => AnyValue::DoubleValue(*f),
        TagValue::Binary(bytes) => AnyValue::BytesValue(bytes.clone()),
        TagValue::Unsupported(type_name) => {
            return Err(TranslateError::UnsupportedTagType {
                key: kv.key.clone(),
                type_name: type_name.clone(),
            })
        }
    };
    Ok(OtlpKeyValue {
        key: kv.key.clone(),
        value,
    })
}

fn micros_to_nanos(micros: u64) -> u64 {
    micros.saturating_mul(1_000)
}
