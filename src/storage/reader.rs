use async_trait::async_trait;

use crate::model::{Operation, Trace, TraceId};
use crate::query::{OperationListQuery, ServiceListQuery, TraceByIdQuery, TraceSearchQuery};
use crate::tenancy::TenantContext;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("trace {0} not found")]
    NotFound(TraceId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Read side of a trace store
///
/// Every call receives the request's [`TenantContext`] and must restrict
/// itself to that tenant's data. Each call is awaited inside the request
/// handler, so a dropped request drops the in-flight call with it.
#[async_trait]
pub trait SpanReader: Send + Sync {
    async fn get_services(
        &self,
        ctx: &TenantContext,
        query: &ServiceListQuery,
    ) -> Result<Vec<String>, StorageError>;

    async fn get_operations(
        &self,
        ctx: &TenantContext,
        query: &OperationListQuery,
    ) -> Result<Vec<Operation>, StorageError>;

    async fn get_trace(
        &self,
        ctx: &TenantContext,
        query: &TraceByIdQuery,
    ) -> Result<Trace, StorageError>;

    async fn find_traces(
        &self,
        ctx: &TenantContext,
        query: &TraceSearchQuery,
    ) -> Result<Vec<Trace>, StorageError>;
}
