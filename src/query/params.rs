//! HTTP query string -> storage query

use std::collections::BTreeMap;

use super::types::{OperationListQuery, TraceByIdQuery, TraceSearchQuery};
use crate::model::{IdError, SpanKind, TraceId};

pub const PARAM_SERVICE: &str = "service";
pub const PARAM_SPAN_KIND: &str = "span_kind";
pub const PARAM_OPERATION: &str = "operation";
pub const PARAM_TAG: &str = "tag";
pub const PARAM_START: &str = "start";
pub const PARAM_END: &str = "end";
pub const PARAM_MIN_DURATION: &str = "min_duration";
pub const PARAM_MAX_DURATION: &str = "max_duration";
pub const PARAM_LIMIT: &str = "limit";

/// Search result limit when `limit` is not given
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error(transparent)]
    MalformedId(#[from] IdError),

    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ParamError {
    ParamError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Decoded query string, repeated keys preserved in order
#[derive(Debug, Clone, Copy)]
pub struct QueryParams<'a> {
    pairs: &'a [(String, String)],
}

impl<'a> QueryParams<'a> {
    pub fn new(pairs: &'a [(String, String)]) -> Self {
        Self { pairs }
    }

    /// First non-empty value of `name`
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, name: &'static str) -> Result<&'a str, ParamError> {
        self.get(name).ok_or(ParamError::MissingParameter(name))
    }

    fn parse_u64(&self, name: &'static str) -> Result<Option<u64>, ParamError> {
        self.get(name)
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|_| invalid(name, format!("'{}' is not a non-negative integer", v)))
            })
            .transpose()
    }

    fn span_kind(&self) -> Result<Option<SpanKind>, ParamError> {
        self.get(PARAM_SPAN_KIND)
            .map(|v| {
                SpanKind::parse(v).ok_or_else(|| {
                    invalid(
                        PARAM_SPAN_KIND,
                        format!(
                            "'{}' is not one of unspecified, internal, server, client, producer, consumer",
                            v
                        ),
                    )
                })
            })
            .transpose()
    }
}

/// `GET /api/v3/operations`
pub fn parse_operation_query(params: QueryParams<'_>) -> Result<OperationListQuery, ParamError> {
    Ok(OperationListQuery {
        service_name: params.require(PARAM_SERVICE)?.to_string(),
        span_kind: params.span_kind()?,
    })
}

/// `GET /api/v3/traces/{traceId}`. The id comes from the path, the optional
/// window hint from the query string.
pub fn parse_trace_lookup(
    trace_id: &str,
    params: QueryParams<'_>,
) -> Result<TraceByIdQuery, ParamError> {
    let trace_id = TraceId::from_hex(trace_id)?;
    let start_time = params.parse_u64(PARAM_START)?;
    let end_time = params.parse_u64(PARAM_END)?;
    check_range(PARAM_START, start_time, end_time)?;

    Ok(TraceByIdQuery {
        trace_id,
        start_time,
        end_time,
    })
}

/// `GET /api/v3/traces`. `now_micros` is the request time, used when `end`
/// is absent.
pub fn parse_trace_search(
    params: QueryParams<'_>,
    now_micros: u64,
) -> Result<TraceSearchQuery, ParamError> {
    let service_name = params.require(PARAM_SERVICE)?.to_string();
    let operation_name = params.get(PARAM_OPERATION).map(str::to_string);

    let mut tags = BTreeMap::new();
    for entry in params.get_all(PARAM_TAG) {
        let (key, value) = entry
            .split_once(':')
            .ok_or_else(|| invalid(PARAM_TAG, format!("'{}' is not in key:value form", entry)))?;
        if key.is_empty() {
            return Err(invalid(PARAM_TAG, format!("'{}' has an empty key", entry)));
        }
        tags.insert(key.to_string(), value.to_string());
    }

    let start_time_min = params.parse_u64(PARAM_START)?;
    let start_time_max = params.parse_u64(PARAM_END)?.unwrap_or(now_micros);
    check_range(PARAM_START, start_time_min, Some(start_time_max))?;

    let duration_min = params.parse_u64(PARAM_MIN_DURATION)?;
    let duration_max = params.parse_u64(PARAM_MAX_DURATION)?;
    check_range(PARAM_MIN_DURATION, duration_min, duration_max)?;

    let limit = match params.parse_u64(PARAM_LIMIT)? {
        None => DEFAULT_SEARCH_LIMIT,
        Some(0) => return Err(invalid(PARAM_LIMIT, "must be greater than zero")),
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
    };

    Ok(TraceSearchQuery {
        service_name,
        operation_name,
        tags,
        start_time_min,
        start_time_max,
        duration_min,
        duration_max,
        limit,
    })
}

fn check_range(name: &'static str, min: Option<u64>, max: Option<u64>) -> Result<(), ParamError> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => Err(invalid(
            name,
            format!("lower bound {} is after upper bound {}", lo, hi),
        )),
        _ => Ok(()),
    }
}
