use std::collections::BTreeMap;

use crate::model::{SpanKind, TraceId};

/// List all services. Carries no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceListQuery;

/// List operations of one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationListQuery {
    pub service_name: String,
    /// Only return operations of this kind
    pub span_kind: Option<SpanKind>,
}

/// Look up a single trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceByIdQuery {
    pub trace_id: TraceId,
    /// Optional window hint in Unix microseconds; readers may use it to
    /// narrow the partitions they scan.
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
}

impl TraceByIdQuery {
    pub fn new(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            start_time: None,
            end_time: None,
        }
    }
}

/// Search for traces. A trace matches when at least one of its spans
/// satisfies every populated criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSearchQuery {
    pub service_name: String,
    pub operation_name: Option<String>,
    /// All tags must match
    pub tags: BTreeMap<String, String>,
    /// Unix microseconds, inclusive
    pub start_time_min: Option<u64>,
    /// Unix microseconds, inclusive. Defaults to the request time.
    pub start_time_max: u64,
    /// Microseconds, inclusive
    pub duration_min: Option<u64>,
    pub duration_max: Option<u64>,
    pub limit: usize,
}
