//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, temp storage
//! directories, a scripted fake transcoder and a full [`AppContext`]. The
//! [`TestHarness::with_server`] constructor starts Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use sf_av::ToolRegistry;
use sf_core::config::Config;
use sf_core::{EpisodeId, StreamId};
use sf_db::pool::{init_memory_pool, DbPool};
use sf_server::context::AppContext;
use sf_server::router::build_router;
use sf_server::test_support::FakeEngineFactory;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and temporary storage.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub engines: FakeEngineFactory,
    pub config: Config,
    _dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_engines(FakeEngineFactory::new())
    }

    /// Create a new harness whose transcoder is `engines`.
    pub fn with_engines(engines: FakeEngineFactory) -> Self {
        Self::build(engines, |_| {})
    }

    /// Create a new harness, letting `tweak` adjust the config after the
    /// storage paths have been pointed at a temp directory.
    pub fn build(engines: FakeEngineFactory, tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.storage.stream_root = dir.path().join("streams");
        config.storage.sprite_dir = Some(dir.path().join("sprites"));
        tweak(&mut config);
        std::fs::create_dir_all(&config.storage.stream_root).expect("failed to create stream root");

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::new(
            db.clone(),
            config.clone(),
            Arc::new(ToolRegistry::empty()),
            Arc::new(engines.clone()),
        );

        Self {
            ctx,
            db,
            engines,
            config,
            _dir: dir,
        }
    }

    /// The router, for in-process `oneshot` requests.
    pub fn app(&self) -> Router {
        build_router(self.ctx.clone(), None)
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Start this harness's router on a random port.
    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = self.app();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> sf_db::pool::PooledConnection {
        sf_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Insert a stream with `chunks` chunks and write its source asset.
    pub fn add_stream(&self, stream_id: &str, chunks: u32) -> StreamId {
        let id: StreamId = stream_id.parse().expect("valid stream id");
        sf_db::queries::streams::create_stream(&self.conn(), &id, chunks)
            .expect("failed to create stream");
        std::fs::write(self.source_path(&id), b"\x47transport stream")
            .expect("failed to write source asset");
        id
    }

    /// Insert an episode playing `stream_id`.
    pub fn add_episode(&self, episode_id: &str, stream_id: &StreamId) -> EpisodeId {
        let id: EpisodeId = episode_id.parse().expect("valid episode id");
        sf_db::queries::episodes::create_episode(&self.conn(), &id, stream_id, "Episode")
            .expect("failed to create episode");
        id
    }

    pub fn source_path(&self, stream_id: &StreamId) -> PathBuf {
        self.ctx.sprites.storage().source_path(stream_id)
    }

    pub fn sprite_path(&self, stream_id: &StreamId) -> PathBuf {
        self.ctx.sprites.storage().sprite_path(stream_id)
    }
}
