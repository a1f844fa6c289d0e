use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::config::TenancyConfig;
use crate::api::ApiError;

/// Request-scoped identity handed to the span reader. The gateway never
/// filters by tenant itself; readers scope their queries with it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TenantContext {
    pub tenant: Option<String>,
}

impl TenantContext {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: Some(tenant.into()),
        }
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenancyError {
    #[error("missing tenant header '{0}'")]
    MissingTenant(String),

    #[error("unknown tenant")]
    UnknownTenant,
}

/// Resolve the tenant for one request
pub fn resolve_tenant(
    config: &TenancyConfig,
    headers: &HeaderMap,
) -> Result<TenantContext, TenancyError> {
    if !config.enabled {
        return Ok(TenantContext::default());
    }

    let tenant = headers
        .get(config.header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TenancyError::MissingTenant(config.header.clone()))?;

    if !config.is_valid_tenant(tenant) {
        return Err(TenancyError::UnknownTenant);
    }

    Ok(TenantContext::new(tenant))
}

/// Axum middleware: rejects requests without a valid tenant and injects
/// [`TenantContext`] into the request extensions otherwise.
pub async fn tenancy_middleware(
    State(config): State<Arc<TenancyConfig>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = resolve_tenant(&config, req.headers()).map_err(|e| {
        tracing::debug!("Rejecting {} {}: {}", req.method(), req.uri().path(), e);
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
