//! OpenTelemetry (OTLP) output for the query API
//!
//! Trace responses are re-emitted as the OTLP `ResourceSpans` ->
//! `ScopeSpans` -> `Span` hierarchy, using the protobuf-JSON mapping:
//!
//! ```json
//! {"result": {"resourceSpans": [{
//!     "resource": {"attributes": [{"key": "service.name", "value": {"stringValue": "foo"}}]},
//!     "scopeSpans": [{"scope": {}, "spans": [{"traceId": "AAAAAAAAAJYAAAAAAAAAoA==", ...}]}]
//! }]}}
//! ```

mod model;
mod translate;

pub use model::{
    AnyValue, Event, GatewayEnvelope, InstrumentationScope, KeyValue, Link, Resource,
    ResourceSpans, ScopeSpans, Span, Status, StatusCode, TracesData,
};
pub use translate::{translate_trace, translate_traces, TranslateError, SERVICE_NAME_KEY};
