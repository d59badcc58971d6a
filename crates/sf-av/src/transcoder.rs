//! Transcoding engine abstraction.
//!
//! A [`Transcoder`] is a short-lived engine instance with its own private
//! filesystem: callers load it, stage input files by name, run one command,
//! read outputs back by name and then terminate it. [`EngineGuard`] owns an
//! instance and terminates it on drop, so every exit path (success, `?`
//! early return, panic unwind, or the future being cancelled by a timeout)
//! releases the engine.
//!
//! [`FfmpegEngine`] implements the trait on top of the ffmpeg CLI, using a
//! [`Workspace`] as the engine filesystem.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;
use crate::workspace::Workspace;

/// One transcoding engine instance.
#[async_trait]
pub trait Transcoder: Send {
    /// Prepare the engine. Must be called before any other operation.
    async fn load(&mut self) -> sf_core::Result<()>;

    /// Make the file at `source` available to the engine as `name`.
    async fn stage_file(&mut self, name: &str, source: &Path) -> sf_core::Result<()>;

    /// Run one command. Arguments refer to staged files by name.
    async fn exec(&mut self, args: &[String]) -> sf_core::Result<()>;

    /// Read a file the engine produced.
    async fn read_file(&mut self, name: &str) -> sf_core::Result<Vec<u8>>;

    /// Release everything the engine holds. Idempotent.
    fn terminate(&mut self);
}

/// Creates fresh engine instances; one per generation.
pub trait TranscoderFactory: Send + Sync + fmt::Debug {
    fn create(&self) -> Box<dyn Transcoder>;
}

// ---------------------------------------------------------------------------
// EngineGuard
// ---------------------------------------------------------------------------

/// Owns a [`Transcoder`] and terminates it when dropped.
pub struct EngineGuard {
    engine: Box<dyn Transcoder>,
}

impl EngineGuard {
    pub fn new(engine: Box<dyn Transcoder>) -> Self {
        Self { engine }
    }
}

impl Deref for EngineGuard {
    type Target = dyn Transcoder;

    fn deref(&self) -> &Self::Target {
        self.engine.as_ref()
    }
}

impl DerefMut for EngineGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.engine.as_mut()
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        self.engine.terminate();
    }
}

impl fmt::Debug for EngineGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineGuard").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// FfmpegEngine
// ---------------------------------------------------------------------------

/// ffmpeg CLI engine backed by a scratch [`Workspace`].
#[derive(Debug)]
pub struct FfmpegEngine {
    program: Option<PathBuf>,
    timeout: Duration,
    workspace: Option<Workspace>,
}

impl FfmpegEngine {
    /// Engine that runs `program` with each command limited to `timeout`.
    ///
    /// `None` means ffmpeg was not found; [`Transcoder::load`] then fails.
    pub fn new(program: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            program,
            timeout,
            workspace: None,
        }
    }

    fn workspace(&self) -> sf_core::Result<&Workspace> {
        self.workspace
            .as_ref()
            .ok_or_else(|| sf_core::Error::tool("ffmpeg", "engine is not loaded"))
    }
}

#[async_trait]
impl Transcoder for FfmpegEngine {
    async fn load(&mut self) -> sf_core::Result<()> {
        if self.program.is_none() {
            return Err(sf_core::Error::tool(
                "ffmpeg",
                "ffmpeg not found; is it installed and in PATH?",
            ));
        }
        if self.workspace.is_none() {
            let ws = Workspace::new()?;
            tracing::trace!(path = %ws.path().display(), "ffmpeg workspace created");
            self.workspace = Some(ws);
        }
        Ok(())
    }

    async fn stage_file(&mut self, name: &str, source: &Path) -> sf_core::Result<()> {
        self.workspace()?.stage(name, source).await
    }

    async fn exec(&mut self, args: &[String]) -> sf_core::Result<()> {
        let ws = self.workspace()?;
        let program = self
            .program
            .clone()
            .ok_or_else(|| sf_core::Error::tool("ffmpeg", "engine is not loaded"))?;

        let mut cmd = ToolCommand::new(program);
        cmd.timeout(self.timeout);
        cmd.current_dir(ws.path());
        cmd.args(args.iter().cloned());
        cmd.execute().await?;
        Ok(())
    }

    async fn read_file(&mut self, name: &str) -> sf_core::Result<Vec<u8>> {
        self.workspace()?.read(name).await
    }

    fn terminate(&mut self) {
        if let Some(ws) = self.workspace.take() {
            tracing::trace!(path = %ws.path().display(), "ffmpeg workspace released");
        }
    }
}

/// Builds [`FfmpegEngine`]s from the tool registry.
#[derive(Debug, Clone)]
pub struct FfmpegEngineFactory {
    tools: Arc<ToolRegistry>,
    timeout: Duration,
}

impl FfmpegEngineFactory {
    pub fn new(tools: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { tools, timeout }
    }
}

impl TranscoderFactory for FfmpegEngineFactory {
    fn create(&self) -> Box<dyn Transcoder> {
        let program = self.tools.require("ffmpeg").ok().map(|t| t.path.clone());
        Box::new(FfmpegEngine::new(program, self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        terminated: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transcoder for CountingEngine {
        async fn load(&mut self) -> sf_core::Result<()> {
            Ok(())
        }
        async fn stage_file(&mut self, _name: &str, _source: &Path) -> sf_core::Result<()> {
            Ok(())
        }
        async fn exec(&mut self, _args: &[String]) -> sf_core::Result<()> {
            Err(sf_core::Error::tool("fake", "exec failed"))
        }
        async fn read_file(&mut self, _name: &str) -> sf_core::Result<Vec<u8>> {
            Ok(Vec::new())
        }
        fn terminate(&mut self) {
            self.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn guard_terminates_after_error() {
        let terminated = Arc::new(AtomicUsize::new(0));

        async fn run(mut engine: EngineGuard) -> sf_core::Result<()> {
            engine.load().await?;
            engine.exec(&["-i".to_string()]).await?;
            Ok(())
        }

        let guard = EngineGuard::new(Box::new(CountingEngine {
            terminated: terminated.clone(),
        }));
        assert!(run(guard).await.is_err());
        assert_eq!(terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unloaded_engine_fails_without_ffmpeg() {
        let mut engine = FfmpegEngine::new(None, Duration::from_secs(5));
        let err = engine.load().await.unwrap_err();
        assert!(err.to_string().contains("ffmpeg not found"));
        let err = engine.exec(&[]).await.unwrap_err();
        assert!(err.to_string().contains("not loaded"));
    }

    #[tokio::test]
    async fn factory_without_ffmpeg_creates_unloadable_engine() {
        let factory =
            FfmpegEngineFactory::new(Arc::new(ToolRegistry::empty()), Duration::from_secs(1));
        let mut engine = factory.create();
        assert!(engine.load().await.is_err());
    }

    #[tokio::test]
    async fn terminate_removes_workspace() {
        let mut engine = FfmpegEngine::new(Some(PathBuf::from("ffmpeg")), Duration::from_secs(5));
        engine.load().await.unwrap();
        let dir = engine.workspace().unwrap().path().to_path_buf();
        assert!(dir.exists());

        engine.terminate();
        assert!(!dir.exists());
        // Second call is a no-op.
        engine.terminate();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exec_runs_inside_workspace() {
        let src_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("stream.ts");
        std::fs::write(&source, b"frames").unwrap();

        // `sh` stands in for ffmpeg: copy the staged input to the output name.
        let mut engine = FfmpegEngine::new(Some(PathBuf::from("sh")), Duration::from_secs(5));
        engine.load().await.unwrap();
        engine.stage_file("input.ts", &source).await.unwrap();
        engine
            .exec(&["-c".to_string(), "cp input.ts output.jpg".to_string()])
            .await
            .unwrap();
        assert_eq!(engine.read_file("output.jpg").await.unwrap(), b"frames");
        engine.terminate();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exec_timeout_is_tool_error() {
        let mut engine = FfmpegEngine::new(Some(PathBuf::from("sleep")), Duration::from_millis(100));
        engine.load().await.unwrap();
        let err = engine.exec(&["10".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
    }
}
