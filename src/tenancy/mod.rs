//! Multi-tenancy enforcement
//!
//! When enabled, every API request must carry a tenant header whose value is
//! on the configured allow-list (or any value, if the list is empty). The
//! tenant travels with the request as a [`TenantContext`] and reaches the
//! span reader unchanged.

mod config;
mod guard;

pub use config::{TenancyConfig, DEFAULT_TENANT_HEADER};
pub use guard::{resolve_tenant, tenancy_middleware, TenancyError, TenantContext};
