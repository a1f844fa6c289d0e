//! Spangate Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - SPANGATE_HOST: Bind address (default: 0.0.0.0)
//! - SPANGATE_PORT: Port number (default: 16686)
//! - SPANGATE_BASE_PATH: Prefix for the /api/v3 routes (default: none)
//! - SPANGATE_REQUEST_TIMEOUT_SECS: Per-request deadline (default: 30)
//! - SPANGATE_FIXTURE: JSON span fixture for the in-memory store (default: none)
//! - RUST_LOG: Log level (default: info)
//!
//! Tenancy:
//! - SPANGATE_TENANCY_ENABLED: Require a tenant header on every API request
//! - SPANGATE_TENANCY_HEADER: Header name (default: x-tenant)
//! - SPANGATE_TENANTS: Comma-separated allow-list (empty accepts any tenant)

use spangate::api::{run_server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spangate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    tracing::info!("Spangate configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!(
        "  Base path: {}",
        config.normalized_base_path().as_deref().unwrap_or("/")
    );
    tracing::info!("  Request timeout: {} seconds", config.request_timeout_secs);
    match &config.fixture_path {
        Some(path) => tracing::info!("  Fixture: {}", path.display()),
        None => tracing::info!("  Fixture: none"),
    }

    if config.tenancy.enabled {
        tracing::info!("  Tenancy: ENABLED (header '{}')", config.tenancy.header);
        if config.tenancy.tenants.is_empty() {
            tracing::info!("  Tenants: any");
        } else {
            tracing::info!("  Tenants: {}", config.tenancy.tenants.len());
        }
    } else {
        tracing::info!("  Tenancy: DISABLED");
    }

    run_server(config).await
}
