use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    find_traces, get_operations, get_services, get_trace, get_trace_without_id, health_check,
    AppState,
};
use crate::query::SystemClock;
use crate::storage::MemoryReader;
use crate::tenancy::{tenancy_middleware, TenancyConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for the `/api/v3` routes, e.g. `/jaeger`. Empty mounts at root.
    pub base_path: String,
    /// Requests still running after this are answered with 408 and dropped,
    /// together with their in-flight storage call
    pub request_timeout_secs: u64,
    pub tenancy: TenancyConfig,
    /// Span fixture loaded into the in-memory reader at startup
    pub fixture_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 16686,
            base_path: String::new(),
            request_timeout_secs: 30,
            tenancy: TenancyConfig::default(),
            fixture_path: None,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("SPANGATE_HOST").unwrap_or(defaults.host);
        let port = std::env::var("SPANGATE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let base_path = std::env::var("SPANGATE_BASE_PATH").unwrap_or(defaults.base_path);
        let request_timeout_secs = std::env::var("SPANGATE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);
        let fixture_path = std::env::var("SPANGATE_FIXTURE")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            base_path,
            request_timeout_secs,
            tenancy: TenancyConfig::from_env(),
            fixture_path,
        }
    }

    /// Base path with a leading and no trailing slash, or `None` for root
    pub fn normalized_base_path(&self) -> Option<String> {
        let trimmed = self.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(format!("/{}", trimmed))
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let tenancy = Arc::new(config.tenancy.clone());

    let api = Router::new()
        .route("/api/v3/services", get(get_services))
        .route("/api/v3/operations", get(get_operations))
        .route("/api/v3/traces", get(find_traces))
        .route("/api/v3/traces/", get(get_trace_without_id))
        .route("/api/v3/traces/:trace_id", get(get_trace))
        // Tenancy runs before any handler body, so rejected requests never
        // reach the reader
        .route_layer(middleware::from_fn_with_state(tenancy, tenancy_middleware))
        .with_state(state);

    let api = match config.normalized_base_path() {
        Some(base) => Router::new().nest(&base, api),
        None => api,
    };

    Router::new()
        .route("/health", get(health_check))
        .merge(api)
        // Middleware
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let reader = match &config.fixture_path {
        Some(path) => MemoryReader::from_json_file(path)?,
        None => {
            tracing::warn!("No SPANGATE_FIXTURE set, serving an empty in-memory store");
            MemoryReader::new()
        }
    };

    let state = Arc::new(AppState {
        reader: Arc::new(reader),
        clock: Arc::new(SystemClock),
    });

    let app = build_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting spangate on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("spangate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
