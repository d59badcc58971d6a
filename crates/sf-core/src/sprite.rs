//! Seek-preview sprite geometry and the metadata served to players.
//!
//! A sprite is one JPEG holding `columns` thumbnails in a single row. Tile
//! `i` shows the frame at `i * interval` seconds. The geometry is a pure
//! function of the stream's chunk count and a handful of fixed constants.

use serde::{Deserialize, Serialize};

use crate::ids::StreamId;

/// Seconds between two sampled frames.
pub const DEFAULT_INTERVAL_SECS: u32 = 1;
/// Width of a single thumbnail tile in pixels.
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 160;
/// Height of a single thumbnail tile in pixels.
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 90;
/// Preview frames sampled per stream chunk.
pub const DEFAULT_FRAMES_PER_CHUNK: u32 = 2;

const SPRITE_SUFFIX: &str = "_sprite.jpg";

/// Name of the sprite artifact for `stream_id`.
pub fn sprite_file_name(stream_id: &StreamId) -> String {
    format!("{stream_id}{SPRITE_SUFFIX}")
}

/// Stream id of a sprite artifact name, or `None` for any other file.
pub fn parse_sprite_file_name(name: &str) -> Option<StreamId> {
    name.strip_suffix(SPRITE_SUFFIX)?.parse().ok()
}

/// Tile layout used for every sprite produced by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteGeometry {
    pub interval_secs: u32,
    pub width: u32,
    pub height: u32,
    pub frames_per_chunk: u32,
}

impl Default for SpriteGeometry {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            width: DEFAULT_THUMBNAIL_WIDTH,
            height: DEFAULT_THUMBNAIL_HEIGHT,
            frames_per_chunk: DEFAULT_FRAMES_PER_CHUNK,
        }
    }
}

impl SpriteGeometry {
    /// `ceil(number_of_chunks * frames_per_chunk / interval)`.
    pub fn columns(&self, number_of_chunks: u32) -> u32 {
        let frames = u64::from(number_of_chunks) * u64::from(self.frames_per_chunk);
        let interval = u64::from(self.interval_secs.max(1));
        u32::try_from(frames.div_ceil(interval)).unwrap_or(u32::MAX)
    }

    /// The ffmpeg video filter that samples, scales and tiles `columns` frames.
    pub fn video_filter(&self, columns: u32) -> String {
        format!(
            "fps=1/{},scale={}:{},tile={}x1",
            self.interval_secs.max(1),
            self.width,
            self.height,
            columns
        )
    }

    /// Pixel size of the full sprite for `columns` tiles.
    pub fn sprite_dimensions(&self, columns: u32) -> (u32, u32) {
        (self.width.saturating_mul(columns), self.height)
    }

    /// Build the metadata record for a sprite served at `sprite_url`.
    pub fn metadata(&self, sprite_url: String, number_of_chunks: u32) -> SpriteMetadata {
        SpriteMetadata {
            sprite_url,
            interval: self.interval_secs,
            thumbnail_width: self.width,
            thumbnail_height: self.height,
            columns: self.columns(number_of_chunks),
        }
    }
}

/// Metadata a player needs to address individual frames inside a sprite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpriteMetadata {
    /// Public path of the sprite JPEG.
    pub sprite_url: String,
    /// Seconds between tiles.
    pub interval: u32,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// Number of tiles in the single sprite row.
    pub columns: u32,
}
