//! Sheetcalc API Server implementation
//!
//! HTTP REST API server using Axum. Files are referenced by id through a
//! `FileStore`; generated workbooks land in the exports directory.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::store::{FileStore, Manifest, MemoryFileStore};

/// API Server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub exports_dir: PathBuf,
    /// YAML manifest preloading the file store.
    pub manifest: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            exports_dir: PathBuf::from("exports"),
            manifest: None,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub store: Arc<dyn FileStore>,
    pub exports_dir: PathBuf,
}

impl AppState {
    pub fn new(store: Arc<dyn FileStore>, exports_dir: PathBuf) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            store,
            exports_dir,
        }
    }
}

/// Build the router with all endpoints, CORS and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Files
        .route(
            "/api/v1/files",
            get(handlers::list_files).post(handlers::register_file),
        )
        .route("/api/v1/files/:id/sheets", get(handlers::list_sheets))
        .route("/api/v1/files/:id/sheets/:sheet", get(handlers::sheet_data))
        // Calculations
        .route("/api/v1/calculate", post(handlers::calculate))
        .route("/api/v1/calculate-column", post(handlers::calculate_column))
        .route("/api/v1/calculate-rowwise", post(handlers::calculate_rowwise))
        .route("/api/v1/calculate-multi", post(handlers::calculate_multi))
        // Output workbooks
        .route("/api/v1/export", post(handlers::export))
        .route("/api/v1/export-template", post(handlers::export_template))
        .route("/api/v1/merge", post(handlers::merge))
        // Reference data
        .route("/api/v1/provinces", get(handlers::provinces))
        .route("/api/v1/provinces/:id/units", get(handlers::units))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetcalc_server=info,sheetcalc=info,tower_http=info".into()),
        )
        .init();

    let store = match &config.manifest {
        Some(path) => {
            let manifest = Manifest::from_file(path)?;
            info!(manifest = %path.display(), files = manifest.files.len(), "loading file manifest");
            MemoryFileStore::from_manifest(&manifest)?
        }
        None => MemoryFileStore::new(),
    };
    let state = Arc::new(AppState::new(Arc::new(store), config.exports_dir.clone()));
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("📊 Sheetcalc API Server starting on http://{}", addr);
    info!("   Exports: {}", config.exports_dir.display());
    info!("   Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Sheetcalc API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
