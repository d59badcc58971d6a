//! # sf-av
//!
//! Audio/video processing and external tool management for spriteforge.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the path to
//!   ffmpeg.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Workspace management** ([`Workspace`]) -- private temporary directory
//!   used as a transcoder's filesystem.
//! - **Transcoding engines** ([`Transcoder`], [`EngineGuard`],
//!   [`FfmpegEngine`]) -- load / stage / exec / read / terminate lifecycle
//!   with guaranteed teardown.

pub mod command;
pub mod tools;
pub mod transcoder;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use transcoder::{EngineGuard, FfmpegEngine, FfmpegEngineFactory, Transcoder, TranscoderFactory};
pub use workspace::Workspace;
