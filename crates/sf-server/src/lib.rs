//! sf-server: HTTP API server and sprite service.
//!
//! This crate ties the other sf-* crates together into a running server:
//!
//! - [`sprites::SpriteService`] resolves episodes and generates sprites on
//!   demand through a [`sf_av::Transcoder`]
//! - Axum router serving sprite metadata, the sprite files themselves and
//!   operational endpoints
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod sprites;
pub mod storage;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use sf_av::{FfmpegEngineFactory, ToolRegistry};
use sf_core::config::Config;
use sf_db::pool::DbPool;

use crate::context::AppContext;

/// Open (creating if needed) the catalogue database at `config.server.db_path`.
pub fn open_database(config: &Config) -> sf_core::Result<DbPool> {
    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let db_str = db_path.to_string_lossy();
    let db = sf_db::pool::init_pool(&db_str)?;
    if existed {
        tracing::info!("Database opened (existing) at {db_str}");
    } else {
        tracing::info!("Database created (new) at {db_str}");
    }
    Ok(db)
}

/// Discover ffmpeg and log what was found.
pub fn discover_tools(config: &Config) -> Arc<ToolRegistry> {
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}; sprite generation will fail", info.name);
        }
    }
    tools
}

/// Build a context backed by the real database and the ffmpeg engine.
pub fn build_context(config: Config) -> sf_core::Result<AppContext> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db = open_database(&config)?;
    let tools = discover_tools(&config);
    let engines = Arc::new(FfmpegEngineFactory::new(
        tools.clone(),
        config.thumbnails.generation_timeout(),
    ));

    let sprite_dir = config.storage.sprite_dir();
    if !sprite_dir.exists() {
        std::fs::create_dir_all(sprite_dir)?;
        tracing::info!("Created sprite directory {}", sprite_dir.display());
    }
    if !config.storage.stream_root.exists() {
        tracing::warn!(
            "Stream root {} does not exist; every generation will fail",
            config.storage.stream_root.display()
        );
    }

    Ok(AppContext::new(db, config, tools, engines))
}

/// Install the global Prometheus recorder.
///
/// Returns `None` (and logs) if a recorder is already installed.
pub fn install_metrics_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!("Metrics recorder not installed: {e}");
            None
        }
    }
}

/// Start the spriteforge server.
///
/// Initializes the database and tools, then serves HTTP until a shutdown
/// signal is received.
pub async fn start(config: Config) -> sf_core::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sf_core::Error::Internal(format!("Invalid server address: {e}")))?;
    let static_dir = config.server.static_dir.clone();

    let mut ctx = build_context(config)?;
    if let Some(handle) = install_metrics_recorder() {
        ctx = ctx.with_metrics(handle);
    }

    let app = router::build_router(ctx, static_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| sf_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Starting server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| sf_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
