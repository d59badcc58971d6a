//! On-disk layout for source streams and published sprites.
//!
//! Paths are derived from the stream id only:
//!
//! - source asset: `<stream_root>/<stream_id>.ts`
//! - sprite:       `<sprite_dir>/<stream_id>_sprite.jpg`
//! - public URL:   `<public_prefix>/<stream_id>_sprite.jpg`
//!
//! Sprites are published atomically: bytes go to a hidden temporary file in
//! the sprite directory which is then renamed over the final name, so a
//! reader never observes a truncated sprite.

use std::path::{Path, PathBuf};

use sf_core::config::StorageConfig;
use sf_core::sprite::sprite_file_name;
use sf_core::{Error, Result, StreamId};

/// Resolves and writes sprite-related files.
#[derive(Debug, Clone)]
pub struct SpriteStorage {
    stream_root: PathBuf,
    sprite_dir: PathBuf,
    public_prefix: String,
}

impl SpriteStorage {
    pub fn new(
        stream_root: impl Into<PathBuf>,
        sprite_dir: impl Into<PathBuf>,
        public_prefix: &str,
    ) -> Self {
        Self {
            stream_root: stream_root.into(),
            sprite_dir: sprite_dir.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &StorageConfig) -> Self {
        Self::new(&cfg.stream_root, cfg.sprite_dir(), &cfg.public_prefix)
    }

    pub fn stream_root(&self) -> &Path {
        &self.stream_root
    }

    pub fn sprite_dir(&self) -> &Path {
        &self.sprite_dir
    }

    /// URL path prefix the sprite directory is served under (no trailing `/`).
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Transport-stream source for `stream_id`.
    pub fn source_path(&self, stream_id: &StreamId) -> PathBuf {
        self.stream_root.join(format!("{stream_id}.ts"))
    }

    /// Final location of the sprite for `stream_id`.
    pub fn sprite_path(&self, stream_id: &StreamId) -> PathBuf {
        self.sprite_dir.join(sprite_file_name(stream_id))
    }

    /// Public URL of the sprite for `stream_id`.
    pub fn sprite_url(&self, stream_id: &StreamId) -> String {
        format!("{}/{}", self.public_prefix, sprite_file_name(stream_id))
    }

    /// Non-mutating existence probe.
    pub async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    /// Atomically write `data` to `path`.
    ///
    /// On failure the temporary file is removed and nothing is visible under
    /// `path`.
    pub async fn publish(&self, path: &Path, data: &[u8]) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::Internal(format!("no parent directory for {}", path.display())))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::Internal(format!("no file name in {}", path.display())))?
            .to_string_lossy();

        tokio::fs::create_dir_all(dir).await?;

        let tmp = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        let result = async {
            tokio::fs::write(&tmp, data).await?;
            tokio::fs::rename(&tmp, path).await?;
            Ok::<(), Error>(())
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(root: &Path) -> SpriteStorage {
        SpriteStorage::new(root.join("streams"), root.join("sprites"), "/public/thumbnails/")
    }

    #[test]
    fn paths_follow_stream_id() {
        let s = SpriteStorage::new("/streams", "/sprites", "/public/thumbnails");
        let id: StreamId = "test-stream-id".parse().unwrap();
        assert_eq!(s.source_path(&id), PathBuf::from("/streams/test-stream-id.ts"));
        assert_eq!(
            s.sprite_path(&id),
            PathBuf::from("/sprites/test-stream-id_sprite.jpg")
        );
        assert_eq!(
            s.sprite_url(&id),
            "/public/thumbnails/test-stream-id_sprite.jpg"
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path());
        assert_eq!(s.public_prefix(), "/public/thumbnails");
    }

    #[test]
    fn sprite_dir_defaults_to_stream_root() {
        let cfg = StorageConfig {
            stream_root: PathBuf::from("/data/streams"),
            sprite_dir: None,
            public_prefix: "/public/thumbnails".into(),
        };
        let s = SpriteStorage::from_config(&cfg);
        assert_eq!(s.sprite_dir(), Path::new("/data/streams"));
    }

    #[tokio::test]
    async fn publish_creates_dir_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path());
        let id: StreamId = "abc".parse().unwrap();
        let path = s.sprite_path(&id);

        assert!(!s.exists(&path).await.unwrap());
        s.publish(&path, b"jpeg bytes").await.unwrap();
        assert!(s.exists(&path).await.unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg bytes");

        // No temporary files are left behind.
        let leftovers: Vec<_> = std::fs::read_dir(s.sprite_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn publish_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path());
        let path = s.sprite_path(&"abc".parse().unwrap());
        s.publish(&path, b"first").await.unwrap();
        s.publish(&path, b"second").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn publish_failure_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path());
        let path = s.sprite_path(&"abc".parse().unwrap());
        // A directory squatting on the final name makes the rename fail.
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        assert!(s.publish(&path, b"data").await.is_err());
        let names: Vec<String> = std::fs::read_dir(s.sprite_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["abc_sprite.jpg"]);
        assert!(path.is_dir());
    }
}
