//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, storage layout, sprite geometry and external
//! tools. Every section defaults sensibly so a completely empty `{}` file is
//! valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::sprite::{
    SpriteGeometry, DEFAULT_FRAMES_PER_CHUNK, DEFAULT_INTERVAL_SECS, DEFAULT_THUMBNAIL_HEIGHT,
    DEFAULT_THUMBNAIL_WIDTH,
};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub thumbnails: ThumbnailConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if !self.storage.public_prefix.starts_with('/') {
            warnings.push(format!(
                "storage.public_prefix '{}' should start with '/'",
                self.storage.public_prefix
            ));
        }
        if self.storage.public_prefix.len() > 1 && self.storage.public_prefix.ends_with('/') {
            warnings.push("storage.public_prefix should not end with '/'".into());
        }

        let t = &self.thumbnails;
        if t.interval_secs == 0 {
            warnings.push("thumbnails.interval_secs is 0; 1 will be used".into());
        }
        if t.width == 0 || t.height == 0 {
            warnings.push(format!(
                "thumbnails size {}x{} is empty; sprites cannot be generated",
                t.width, t.height
            ));
        }
        if t.frames_per_chunk == 0 {
            warnings.push("thumbnails.frames_per_chunk is 0; sprites will have no tiles".into());
        }
        if t.generation_timeout_secs == 0 {
            warnings.push("thumbnails.generation_timeout_secs is 0; every generation will time out".into());
        }

        if let Some(ref p) = self.tools.ffmpeg_path {
            if !p.exists() {
                warnings.push(format!(
                    "tools.ffmpeg_path {} does not exist; falling back to PATH",
                    p.display()
                ));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: None,
            db_path: PathBuf::from("./data/spriteforge.db"),
        }
    }
}

/// Where source streams live and where sprites are published.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<stream_id>.ts` source assets.
    pub stream_root: PathBuf,
    /// Directory sprites are written to. Defaults to `stream_root`.
    pub sprite_dir: Option<PathBuf>,
    /// URL path the sprite directory is served under.
    pub public_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            stream_root: PathBuf::from("./data/streams"),
            sprite_dir: None,
            public_prefix: "/public/thumbnails".into(),
        }
    }
}

impl StorageConfig {
    /// Effective sprite directory.
    pub fn sprite_dir(&self) -> &Path {
        self.sprite_dir.as_deref().unwrap_or(&self.stream_root)
    }
}

/// Sprite geometry and generation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub interval_secs: u32,
    pub width: u32,
    pub height: u32,
    pub frames_per_chunk: u32,
    pub generation_timeout_secs: u64,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            width: DEFAULT_THUMBNAIL_WIDTH,
            height: DEFAULT_THUMBNAIL_HEIGHT,
            frames_per_chunk: DEFAULT_FRAMES_PER_CHUNK,
            generation_timeout_secs: 120,
        }
    }
}

impl ThumbnailConfig {
    pub fn geometry(&self) -> SpriteGeometry {
        SpriteGeometry {
            interval_secs: self.interval_secs.max(1),
            width: self.width,
            height: self.height,
            frames_per_chunk: self.frames_per_chunk,
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.public_prefix, "/public/thumbnails");
        assert_eq!(cfg.storage.sprite_dir(), Path::new("./data/streams"));
        assert_eq!(cfg.thumbnails.geometry(), SpriteGeometry::default());
        assert_eq!(cfg.thumbnails.generation_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn sprite_dir_override() {
        let json = r#"{"storage": {"stream_root": "/streams", "sprite_dir": "/sprites"}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.storage.stream_root, PathBuf::from("/streams"));
        assert_eq!(cfg.storage.sprite_dir(), Path::new("/sprites"));
    }

    #[test]
    fn zero_interval_warns_and_is_clamped() {
        let mut cfg = Config::default();
        cfg.thumbnails.interval_secs = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("interval_secs")));
        assert_eq!(cfg.thumbnails.geometry().interval_secs, 1);
    }

    #[test]
    fn bad_prefix_warns() {
        let mut cfg = Config::default();
        cfg.storage.public_prefix = "thumbs/".into();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("start with")));
        assert!(warnings.iter().any(|w| w.contains("end with")));
    }

    #[test]
    fn missing_ffmpeg_override_warns() {
        let mut cfg = Config::default();
        cfg.tools.ffmpeg_path = Some(PathBuf::from("/nonexistent/ffmpeg"));
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("ffmpeg_path")));
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"server": {"port": 9090}, "thumbnails": {"width": 320}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.thumbnails.width, 320);
        assert_eq!(cfg.thumbnails.height, 90);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"port": 7070}}"#).unwrap();
        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.server.port, 7070);
    }
}
