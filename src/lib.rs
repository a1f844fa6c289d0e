//! Spangate: Query Gateway for Distributed Traces
//!
//! A REST/JSON query surface over a trace store. Results come back in the
//! OpenTelemetry (OTLP) protobuf-JSON envelope, so clients never see the
//! storage span model or its identifier encodings.
//!
//! # Features
//!
//! - **Service Discovery**: list services and their operations
//! - **Trace Lookup**: fetch one trace by its 128-bit hex id
//! - **Trace Search**: filter by service, operation, tags, time and duration
//! - **OTLP Output**: ResourceSpans grouped per process, fixed-width binary ids
//! - **Multi-Tenancy**: optional tenant header, propagated to the reader
//!
//! # Example
//!
//! ```no_run
//! use spangate::model::{KeyValue, Process, Span, SpanId, Trace, TraceId};
//! use spangate::otlp::translate_trace;
//!
//! let mut span = Span::new(TraceId::new(150, 160), SpanId::new(180), "foobar");
//! span.process = Process::new("foo");
//! span.tags.push(KeyValue::string("span.kind", "server"));
//!
//! let resource_spans = translate_trace(&Trace::new(vec![span])).unwrap();
//! println!("{}", serde_json::to_string_pretty(&resource_spans).unwrap());
//! ```

pub mod api;
pub mod model;
pub mod otlp;
pub mod query;
pub mod storage;
pub mod tenancy;

// Re-export commonly used types
pub use api::{build_router, run_server, ApiError, AppState, ServerConfig};
pub use model::{SpanId, Trace, TraceId};
pub use storage::{MemoryReader, SpanReader, StorageError};
