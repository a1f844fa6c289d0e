pub mod clock;
pub mod params;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use params::{
    parse_operation_query, parse_trace_lookup, parse_trace_search, ParamError, QueryParams,
    DEFAULT_SEARCH_LIMIT,
};
pub use types::{OperationListQuery, ServiceListQuery, TraceByIdQuery, TraceSearchQuery};
