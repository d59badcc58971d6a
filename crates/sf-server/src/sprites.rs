//! Sprite metadata service and on-demand sprite generation.
//!
//! The sprite file on disk is the cache. A metadata request resolves the
//! episode to its stream, probes for `<stream_id>_sprite.jpg` and only when
//! it is missing runs one transcoder pass that samples, scales and tiles the
//! stream's frames into a single-row JPEG.
//!
//! Concurrent first requests for the same stream are coalesced: one task
//! generates, the others wait on the same [`OnceCell`] and then observe its
//! result.

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::OnceCell;

use sf_av::{EngineGuard, TranscoderFactory};
use sf_core::{EpisodeId, Error, Result, SpriteGeometry, SpriteMetadata, StreamId};
use sf_db::models::Stream;
use sf_db::pool::DbPool;

use crate::storage::SpriteStorage;

/// Name the source asset is staged under inside the engine.
pub const INPUT_NAME: &str = "input.ts";
/// Name the engine writes the sprite to.
pub const OUTPUT_NAME: &str = "output.jpg";

/// Prometheus counter of metadata requests by outcome.
pub const REQUESTS_METRIC: &str = "spriteforge_sprite_requests_total";
/// Prometheus histogram of successful generation durations.
pub const GENERATION_SECONDS_METRIC: &str = "spriteforge_sprite_generation_seconds";

/// Transcoder arguments producing a `columns`-tile sprite from `input.ts`.
pub fn sprite_command_args(geometry: &SpriteGeometry, columns: u32) -> Vec<String> {
    vec![
        "-i".to_string(),
        INPUT_NAME.to_string(),
        "-vf".to_string(),
        geometry.video_filter(columns),
        "-frames:v".to_string(),
        "1".to_string(),
        OUTPUT_NAME.to_string(),
    ]
}

/// How [`SpriteService::ensure_sprite`] satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteOutcome {
    /// The sprite was already on disk.
    Cached,
    /// This call ran the transcoder and published the sprite.
    Generated,
    /// Another in-flight call generated the sprite and this one waited for it.
    Coalesced,
}

impl SpriteOutcome {
    fn metric_label(self) -> &'static str {
        match self {
            SpriteOutcome::Generated => "generated",
            SpriteOutcome::Cached | SpriteOutcome::Coalesced => "hit",
        }
    }
}

/// Tally of a [`SpriteService::warm_all`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    pub generated: usize,
    pub cached: usize,
    /// Streams without chunks; nothing to tile.
    pub skipped: usize,
    pub failed: usize,
}

/// Resolves episodes to sprite metadata, generating sprites as needed.
pub struct SpriteService {
    db: DbPool,
    storage: SpriteStorage,
    geometry: SpriteGeometry,
    engines: Arc<dyn TranscoderFactory>,
    timeout: Duration,
    in_flight: DashMap<StreamId, SharedGeneration>,
}

/// Outcome of one generation, shared by every caller that joined it.
type SharedGeneration = Arc<OnceCell<Result<()>>>;

/// A caller's hold on an in-flight generation.
///
/// The last holder removes the map entry when it lets go, including when its
/// request is cancelled mid-generation.
struct InFlightSlot<'a> {
    map: &'a DashMap<StreamId, SharedGeneration>,
    stream_id: &'a StreamId,
    cell: SharedGeneration,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let cell = std::mem::take(&mut self.cell);
        // Reference counts only change under the shard lock, so the holder
        // that sees just the map's reference and its own is the last one.
        if let Entry::Occupied(entry) = self.map.entry(self.stream_id.clone()) {
            let last = Arc::ptr_eq(entry.get(), &cell) && Arc::strong_count(&cell) == 2;
            drop(cell);
            if last {
                entry.remove();
            }
        }
    }
}

impl std::fmt::Debug for SpriteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteService")
            .field("storage", &self.storage)
            .field("geometry", &self.geometry)
            .field("engines", &self.engines)
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl SpriteService {
    pub fn new(
        db: DbPool,
        storage: SpriteStorage,
        geometry: SpriteGeometry,
        engines: Arc<dyn TranscoderFactory>,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            storage,
            geometry,
            engines,
            timeout,
            in_flight: DashMap::new(),
        }
    }

    pub fn storage(&self) -> &SpriteStorage {
        &self.storage
    }

    pub fn geometry(&self) -> &SpriteGeometry {
        &self.geometry
    }

    /// Number of streams with a generation currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Metadata for the sprite of `episode_id`'s stream, generating the
    /// sprite first if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown episode; no sprite work is done.
    /// - [`Error::Generation`] when the sprite was missing and could not be
    ///   produced.
    pub async fn sprite_metadata(&self, episode_id: &EpisodeId) -> Result<SpriteMetadata> {
        let stream = {
            let conn = sf_db::pool::get_conn(&self.db)?;
            sf_db::queries::episodes::find_episode_with_stream(&conn, episode_id)?
                .ok_or_else(|| Error::not_found("episode", episode_id))?
                .stream
        };

        match self.ensure_sprite(&stream).await {
            Ok(outcome) => {
                metrics::counter!(REQUESTS_METRIC, "outcome" => outcome.metric_label())
                    .increment(1);
                tracing::debug!(
                    episode_id = %episode_id,
                    stream_id = %stream.id,
                    ?outcome,
                    "Sprite ready"
                );
            }
            Err(e) => {
                metrics::counter!(REQUESTS_METRIC, "outcome" => "error").increment(1);
                return Err(e);
            }
        }

        Ok(self
            .geometry
            .metadata(self.storage.sprite_url(&stream.id), stream.number_of_chunks))
    }

    /// Make sure the sprite for `stream` exists on disk.
    ///
    /// Never touches an existing sprite. Concurrent callers for the same
    /// stream share one generation and all observe its result, success or
    /// failure. A request arriving after that generation finished starts
    /// afresh.
    pub async fn ensure_sprite(&self, stream: &Stream) -> Result<SpriteOutcome> {
        let path = self.storage.sprite_path(&stream.id);

        if self.probe(&stream.id, &path).await? {
            return Ok(SpriteOutcome::Cached);
        }

        let slot = self.claim(&stream.id);

        let mut generated = false;
        let ran = &mut generated;
        slot.cell
            .get_or_init(|| async move {
                // The previous holder may have published between our probe
                // and claiming the cell.
                if self.probe(&stream.id, &path).await? {
                    return Ok(());
                }
                *ran = true;
                self.generate_with_timeout(stream).await
            })
            .await
            .clone()?;

        Ok(if generated {
            SpriteOutcome::Generated
        } else {
            SpriteOutcome::Coalesced
        })
    }

    /// Join the in-flight generation for `stream_id`, or register a new one
    /// when none is running or the last one already settled.
    fn claim<'a>(&'a self, stream_id: &'a StreamId) -> InFlightSlot<'a> {
        let cell = {
            let mut entry = self.in_flight.entry(stream_id.clone()).or_default();
            if entry.initialized() {
                *entry = Arc::default();
            }
            entry.value().clone()
        };
        InFlightSlot {
            map: &self.in_flight,
            stream_id,
            cell,
        }
    }

    /// Generate the sprite for `stream_id` and publish it.
    ///
    /// Fails with [`Error::Generation`] for streams without chunks before a
    /// transcoder is created. The engine is released on every exit path.
    pub async fn generate_sprite(&self, stream_id: &StreamId, number_of_chunks: u32) -> Result<()> {
        if number_of_chunks == 0 {
            return Err(Error::generation(
                stream_id,
                Error::Validation("stream has no chunks".into()),
            ));
        }

        self.run_engine(stream_id, number_of_chunks)
            .await
            .map_err(|e| Error::generation(stream_id, e))
    }

    /// Ensure sprites for every stream in the catalogue, one at a time.
    pub async fn warm_all(&self) -> Result<WarmReport> {
        let streams = {
            let conn = sf_db::pool::get_conn(&self.db)?;
            sf_db::queries::streams::list_streams(&conn)?
        };

        let mut report = WarmReport::default();
        for stream in &streams {
            if stream.number_of_chunks == 0 {
                tracing::warn!(stream_id = %stream.id, "Stream has no chunks; skipping");
                report.skipped += 1;
                continue;
            }
            match self.ensure_sprite(stream).await {
                Ok(SpriteOutcome::Generated) => report.generated += 1,
                Ok(_) => report.cached += 1,
                Err(e) => {
                    tracing::error!(stream_id = %stream.id, error = %e, "Sprite warm-up failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            total = streams.len(),
            generated = report.generated,
            cached = report.cached,
            skipped = report.skipped,
            failed = report.failed,
            "Sprite warm-up finished"
        );
        Ok(report)
    }

    async fn probe(&self, stream_id: &StreamId, path: &std::path::Path) -> Result<bool> {
        self.storage
            .exists(path)
            .await
            .map_err(|e| Error::generation(stream_id, e))
    }

    async fn generate_with_timeout(&self, stream: &Stream) -> Result<()> {
        let started = Instant::now();
        tracing::info!(
            stream_id = %stream.id,
            chunks = stream.number_of_chunks,
            "Generating sprite"
        );

        let result = tokio::time::timeout(
            self.timeout,
            self.generate_sprite(&stream.id, stream.number_of_chunks),
        )
        .await
        .unwrap_or_else(|_| {
            Err(Error::generation(
                &stream.id,
                Error::tool("transcoder", format!("timed out after {:?}", self.timeout)),
            ))
        });

        let elapsed = started.elapsed();
        match &result {
            Ok(()) => {
                metrics::histogram!(GENERATION_SECONDS_METRIC).record(elapsed.as_secs_f64());
                tracing::info!(
                    stream_id = %stream.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Sprite generated"
                );
            }
            Err(e) => {
                tracing::error!(
                    stream_id = %stream.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Sprite generation failed"
                );
            }
        }
        result
    }

    async fn run_engine(&self, stream_id: &StreamId, number_of_chunks: u32) -> Result<()> {
        let columns = self.geometry.columns(number_of_chunks);
        let source = self.storage.source_path(stream_id);

        let jpeg = {
            let mut engine = EngineGuard::new(self.engines.create());
            engine.load().await?;
            engine.stage_file(INPUT_NAME, &source).await?;
            engine
                .exec(&sprite_command_args(&self.geometry, columns))
                .await?;
            engine.read_file(OUTPUT_NAME).await?
        };

        check_jpeg(&jpeg, self.geometry.sprite_dimensions(columns))?;

        let path = self.storage.sprite_path(stream_id);
        self.storage.publish(&path, &jpeg).await?;
        tracing::debug!(
            stream_id = %stream_id,
            path = %path.display(),
            bytes = jpeg.len(),
            "Sprite published"
        );
        Ok(())
    }
}

/// Reject engine output that is not a JPEG. A size mismatch is only logged:
/// ffmpeg emits a shorter tile row when the stream has fewer frames than
/// expected.
fn check_jpeg(data: &[u8], expected: (u32, u32)) -> Result<()> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::tool("transcoder", format!("unreadable output: {e}")))?;

    if reader.format() != Some(image::ImageFormat::Jpeg) {
        return Err(Error::tool("transcoder", "output is not a JPEG image"));
    }

    let actual = reader
        .into_dimensions()
        .map_err(|e| Error::tool("transcoder", format!("corrupt JPEG output: {e}")))?;
    if actual != expected {
        tracing::warn!(
            expected = ?expected,
            actual = ?actual,
            "Sprite dimensions differ from tile geometry"
        );
    }
    Ok(())
}
