use std::collections::HashSet;

/// Header carrying the tenant when none is configured
pub const DEFAULT_TENANT_HEADER: &str = "x-tenant";

/// Process-wide tenancy settings, loaded once at startup and shared
/// read-only across requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyConfig {
    /// Whether requests must carry a tenant
    pub enabled: bool,
    /// Request header holding the tenant (lowercase)
    pub header: String,
    /// Accepted tenants. Empty means any non-empty value is accepted.
    pub tenants: HashSet<String>,
}

impl TenancyConfig {
    /// Tenancy switched off; the guard passes every request through
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            header: DEFAULT_TENANT_HEADER.to_string(),
            tenants: HashSet::new(),
        }
    }

    pub fn enabled<I, S>(tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            header: DEFAULT_TENANT_HEADER.to_string(),
            tenants: tenants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into().to_ascii_lowercase();
        self
    }

    /// Create from environment variables
    /// SPANGATE_TENANCY_ENABLED=true
    /// SPANGATE_TENANCY_HEADER=x-tenant
    /// SPANGATE_TENANTS=acme,globex
    pub fn from_env() -> Self {
        let enabled = std::env::var("SPANGATE_TENANCY_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let header = std::env::var("SPANGATE_TENANCY_HEADER")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .map(|h| h.trim().to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_TENANT_HEADER.to_string());
        let tenants = std::env::var("SPANGATE_TENANTS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            enabled,
            header,
            tenants,
        }
    }

    pub fn is_valid_tenant(&self, tenant: &str) -> bool {
        !tenant.is_empty() && (self.tenants.is_empty() || self.tenants.contains(tenant))
    }
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self::disabled()
    }
}
