//! Airside Forms API Server
//!
//! Form builder & pengisian form teknisi bandara via REST API
//!
//! Usage:
//!   cargo run --bin airside_api
//!
//! Environment: lihat `AppConfig::from_env` (AIRSIDE_*, PORT, DB_URL, RUST_LOG)

use airside_forms::api::{create_router, start_cleanup_task, AppState};
use airside_forms::models::AppConfig;
use airside_forms::storage::Store;
use airside_forms::utils::constants::{APP_NAME, APP_VERSION};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = AppConfig::from_env()?;
    let addr = config.socket_addr()?;

    // Database + schema
    let store = Store::open(&config.db_path)?;
    info!("📂 Upload directory: {}", config.upload_dir.display());

    // Create app state
    let state = Arc::new(AppState::new(store, config));

    // Start background cleanup task for the login rate limiter
    let cleanup = start_cleanup_task(state.login_limiter.clone());
    info!("🧹 Background cleanup task started");

    let app = create_router(state);

    info!("🚀 {} API starting on http://{}", APP_NAME, addr);
    info!("");
    info!("Endpoints:");
    info!("  POST /auth/login               - Login (rate limited)");
    info!("  GET  /dashboard                - Role dashboard");
    info!("  *    /admin/users, /admin/sub-roles - Superadmin management");
    info!("  *    /forms                    - Form builder & analytics");
    info!("  *    /my-forms, /my-responses  - Technician forms & responses");
    info!("  POST /api/upload               - File upload");
    info!("  GET  /health                   - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    // Create shutdown signal handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("");
    info!("🛑 Shutdown signal received, cleaning up...");
    cleanup.abort();
    info!("👋 {} API shutdown complete", APP_NAME);

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════════════╗
    ║                                                              ║
    ║        A I R S I D E   F O R M S   v{:<10}               ║
    ║     Form builder & checklist teknisi bandara                 ║
    ║                                                              ║
    ╚══════════════════════════════════════════════════════════════╝
    "#,
        APP_VERSION
    );
}
