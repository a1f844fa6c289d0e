pub mod ids;
pub mod span;

pub use ids::{IdError, SpanId, TraceId};
pub use span::{
    KeyValue, Log, Operation, Process, RefType, Span, SpanKind, SpanRef, TagValue, Trace,
    ERROR_TAG, SPAN_KIND_TAG,
};
