//! Scripted in-memory transcoder for tests.
//!
//! [`FakeEngineFactory`] hands out engines that record every call, fail on
//! demand and answer `exec` by rendering a real JPEG whose size matches the
//! `scale=` and `tile=` parts of the `-vf` filter.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use sf_av::{Transcoder, TranscoderFactory};
use sf_core::{Error, Result};

/// Engine operation a fake can be told to fail at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    Load,
    Stage,
    Exec,
    Read,
}

#[derive(Debug, Default)]
struct Script {
    fail_at: Option<FaultPoint>,
    exec_delay: Option<Duration>,
    output: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Shared {
    created: AtomicUsize,
    terminated: AtomicUsize,
    staged: Mutex<Vec<(String, PathBuf)>>,
    execs: Mutex<Vec<Vec<String>>>,
    script: Mutex<Script>,
}

/// Factory of scripted engines sharing one call log.
#[derive(Debug, Clone, Default)]
pub struct FakeEngineFactory {
    shared: Arc<Shared>,
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(point: FaultPoint) -> Self {
        let f = Self::new();
        f.fail_at(Some(point));
        f
    }

    pub fn with_exec_delay(delay: Duration) -> Self {
        let f = Self::new();
        f.shared.script.lock().exec_delay = Some(delay);
        f
    }

    /// Engines return `bytes` for `output.jpg` instead of a rendered JPEG.
    pub fn with_output(bytes: Vec<u8>) -> Self {
        let f = Self::new();
        f.shared.script.lock().output = Some(bytes);
        f
    }

    pub fn fail_at(&self, point: Option<FaultPoint>) {
        self.shared.script.lock().fail_at = point;
    }

    pub fn created(&self) -> usize {
        self.shared.created.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.shared.terminated.load(Ordering::SeqCst)
    }

    /// Arguments of every `exec` call, in order.
    pub fn exec_calls(&self) -> Vec<Vec<String>> {
        self.shared.execs.lock().clone()
    }

    /// `(name, source)` of every staged file, in order.
    pub fn staged(&self) -> Vec<(String, PathBuf)> {
        self.shared.staged.lock().clone()
    }
}

impl TranscoderFactory for FakeEngineFactory {
    fn create(&self) -> Box<dyn Transcoder> {
        self.shared.created.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeEngine {
            shared: self.shared.clone(),
            loaded: false,
            terminated: false,
            files: HashMap::new(),
        })
    }
}

struct FakeEngine {
    shared: Arc<Shared>,
    loaded: bool,
    terminated: bool,
    files: HashMap<String, Vec<u8>>,
}

impl FakeEngine {
    fn check(&self, point: FaultPoint) -> Result<()> {
        if self.shared.script.lock().fail_at == Some(point) {
            return Err(Error::tool("fake", format!("injected {point:?} failure")));
        }
        if point != FaultPoint::Load && !self.loaded {
            return Err(Error::tool("fake", "engine is not loaded"));
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FakeEngine {
    async fn load(&mut self) -> Result<()> {
        self.check(FaultPoint::Load)?;
        self.loaded = true;
        Ok(())
    }

    async fn stage_file(&mut self, name: &str, source: &Path) -> Result<()> {
        self.check(FaultPoint::Stage)?;
        let data = match tokio::fs::read(source).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found("source asset", source.display()));
            }
            Err(e) => return Err(e.into()),
        };
        self.shared
            .staged
            .lock()
            .push((name.to_string(), source.to_path_buf()));
        self.files.insert(name.to_string(), data);
        Ok(())
    }

    async fn exec(&mut self, args: &[String]) -> Result<()> {
        self.shared.execs.lock().push(args.to_vec());
        let delay = self.shared.script.lock().exec_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check(FaultPoint::Exec)?;

        let output = self.shared.script.lock().output.clone();
        let data = match output {
            Some(bytes) => bytes,
            None => {
                let (w, h) = tile_size(args).unwrap_or((1, 1));
                jpeg_bytes(w, h)
            }
        };
        let out_name = args.last().cloned().unwrap_or_default();
        self.files.insert(out_name, data);
        Ok(())
    }

    async fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        self.check(FaultPoint::Read)?;
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("workspace file", name))
    }

    fn terminate(&mut self) {
        if !self.terminated {
            self.terminated = true;
            self.files.clear();
            self.shared.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Sprite size implied by the `-vf` filter in `args`.
fn tile_size(args: &[String]) -> Option<(u32, u32)> {
    let filter = args
        .iter()
        .position(|a| a == "-vf")
        .and_then(|i| args.get(i + 1))?;

    let mut scale = None;
    let mut columns = None;
    for part in filter.split(',') {
        if let Some(v) = part.strip_prefix("scale=") {
            let (w, h) = v.split_once(':')?;
            scale = Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?));
        } else if let Some(v) = part.strip_prefix("tile=") {
            let (c, _) = v.split_once('x')?;
            columns = Some(c.parse::<u32>().ok()?);
        }
    }
    let (w, h) = scale?;
    Some((w.checked_mul(columns?)?.max(1), h.max(1)))
}

/// Encode a solid grey `width x height` JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
    let mut out = Cursor::new(Vec::new());
    // Encoding an in-memory RGB buffer only fails on zero dimensions.
    if image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .is_err()
    {
        return Vec::new();
    }
    out.into_inner()
}
