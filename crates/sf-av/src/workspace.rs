//! Scratch workspace for transcoding operations.
//!
//! A [`Workspace`] is a private temporary directory that acts as the
//! transcoder's filesystem: inputs are staged into it under fixed names, the
//! tool runs with it as working directory, and outputs are read back out. The
//! directory and everything in it is removed when the workspace is dropped.

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

/// Temporary directory holding one transcoding job's files.
///
/// # Example
///
/// ```no_run
/// use sf_av::Workspace;
///
/// # async fn example() -> sf_core::Result<()> {
/// let ws = Workspace::new()?;
/// ws.stage("input.ts", std::path::Path::new("/streams/abc.ts")).await?;
/// // ... run ffmpeg with ws.path() as working directory ...
/// let jpeg = ws.read("output.jpg").await?;
/// # let _ = jpeg;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    /// Create a fresh, empty workspace in the system temp directory.
    pub fn new() -> sf_core::Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("spriteforge-")
            .tempdir()
            .map_err(|e| sf_core::Error::tool("workspace", format!("failed to create temp dir: {e}")))?;

        Ok(Self { temp_dir })
    }

    /// Path to the workspace directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolve `name` to a path inside the workspace.
    ///
    /// Only plain file names are accepted; anything with a directory
    /// component (including `..`) is rejected.
    pub fn file(&self, name: &str) -> sf_core::Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.temp_dir.path().join(name)),
            _ => Err(sf_core::Error::Validation(format!(
                "invalid workspace file name: {name:?}"
            ))),
        }
    }

    /// Copy `source` into the workspace as `name`.
    pub async fn stage(&self, name: &str, source: &Path) -> sf_core::Result<()> {
        let dest = self.file(name)?;
        match tokio::fs::copy(source, &dest).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(sf_core::Error::not_found(
                "source asset",
                source.display(),
            )),
            Err(e) => Err(sf_core::Error::Io { source: e }),
        }
    }

    /// Read the workspace file `name`.
    pub async fn read(&self, name: &str) -> sf_core::Result<Vec<u8>> {
        let path = self.file(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(sf_core::Error::not_found("workspace file", name))
            }
            Err(e) => Err(sf_core::Error::Io { source: e }),
        }
    }
}
