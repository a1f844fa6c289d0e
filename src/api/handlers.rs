use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::model::{IdError, Operation};
use crate::otlp::{translate_trace, translate_traces, GatewayEnvelope, TracesData};
use crate::query::{
    parse_operation_query, parse_trace_lookup, parse_trace_search, Clock, ParamError,
    QueryParams, ServiceListQuery,
};
use crate::storage::SpanReader;
use crate::tenancy::TenantContext;

/// Application state shared across handlers
pub struct AppState {
    pub reader: Arc<dyn SpanReader>,
    pub clock: Arc<dyn Clock>,
}

/// Raw query string pairs; repeated keys such as `tag` are kept
type RawParams = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Unwrap the query string, turning a rejection into the JSON error body
fn query_pairs(params: RawParams) -> Result<Vec<(String, String)>, ApiError> {
    match params {
        Ok(Query(pairs)) => Ok(pairs),
        Err(rejection) => Err(ParamError::InvalidParameter {
            name: "query",
            reason: rejection.body_text(),
        }
        .into()),
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Services and Operations
// ============================================================================

#[derive(Serialize)]
pub struct ServicesResponse {
    pub services: Vec<String>,
}

pub async fn get_services(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<TenantContext>,
) -> Result<Json<ServicesResponse>, ApiError> {
    let services = state.reader.get_services(&ctx, &ServiceListQuery).await?;
    Ok(Json(ServicesResponse { services }))
}

#[derive(Serialize)]
pub struct OperationsResponse {
    pub operations: Vec<Operation>,
}

pub async fn get_operations(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<TenantContext>,
    params: RawParams,
) -> Result<Json<OperationsResponse>, ApiError> {
    let params = query_pairs(params)?;
    let query = parse_operation_query(QueryParams::new(&params))?;
    tracing::debug!(
        "get_operations service={} span_kind={:?}",
        query.service_name,
        query.span_kind
    );

    let operations = state.reader.get_operations(&ctx, &query).await?;
    Ok(Json(OperationsResponse { operations }))
}

// ============================================================================
// Traces
// ============================================================================

pub async fn get_trace(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<TenantContext>,
    trace_id: Result<Path<String>, PathRejection>,
    params: RawParams,
) -> Result<Json<GatewayEnvelope>, ApiError> {
    let Path(trace_id) = trace_id.map_err(|rejection| {
        tracing::debug!("get_trace rejected path: {}", rejection.body_text());
        ApiError::from(ParamError::MalformedId(IdError::NotUtf8))
    })?;
    let params = query_pairs(params)?;
    let query = parse_trace_lookup(&trace_id, QueryParams::new(&params))?;
    tracing::debug!("get_trace trace_id={}", query.trace_id);

    let trace = state.reader.get_trace(&ctx, &query).await?;
    let resource_spans = translate_trace(&trace)?;

    Ok(Json(GatewayEnvelope {
        result: TracesData { resource_spans },
    }))
}

/// `/api/v3/traces/` with nothing after the slash
pub async fn get_trace_without_id() -> ApiError {
    ParamError::MalformedId(IdError::Empty).into()
}

pub async fn find_traces(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<TenantContext>,
    params: RawParams,
) -> Result<Json<GatewayEnvelope>, ApiError> {
    let params = query_pairs(params)?;
    let query = parse_trace_search(QueryParams::new(&params), state.clock.now_micros())?;
    tracing::debug!(
        "find_traces service={} operation={:?} tags={} window=[{:?}, {}] limit={}",
        query.service_name,
        query.operation_name,
        query.tags.len(),
        query.start_time_min,
        query.start_time_max,
        query.limit
    );

    let traces = state.reader.find_traces(&ctx, &query).await?;
    let result = translate_traces(&traces)?;

    Ok(Json(GatewayEnvelope { result }))
}
