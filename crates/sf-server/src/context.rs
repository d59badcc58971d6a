//! Service-oriented application context.
//!
//! [`AppContext`] is the central struct shared across all route handlers via
//! Axum state. It wraps the immutable infrastructure (DB pool, tools, sprite
//! service, metrics handle) in `Arc`s.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use sf_av::{ToolRegistry, TranscoderFactory};
use sf_core::config::Config;
use sf_db::pool::DbPool;

use crate::sprites::SpriteService;
use crate::storage::SpriteStorage;

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool.
    pub db: DbPool,
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
    /// Sprite lookup and generation.
    pub sprites: Arc<SpriteService>,
    /// Prometheus recorder handle, when one is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppContext {
    /// Wire the sprite service from `config` around the given engine factory.
    pub fn new(
        db: DbPool,
        config: Config,
        tools: Arc<ToolRegistry>,
        engines: Arc<dyn TranscoderFactory>,
    ) -> Self {
        let sprites = Arc::new(SpriteService::new(
            db.clone(),
            SpriteStorage::from_config(&config.storage),
            config.thumbnails.geometry(),
            engines,
            config.thumbnails.generation_timeout(),
        ));

        Self {
            db,
            config: Arc::new(config),
            tools,
            sprites,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
