//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`TaskRegistry`] to in-process fake
//! prober and encoder implementations so the full request path runs without
//! ffmpeg installed. Source files and the cache live in temp directories.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use http_body_util::BodyExt;
use lazyhls::config::Config;
use lazyhls::server::{create_router, AppContext};
use lazyhls::streaming::TaskRegistry;
use lazyhls_av::{EncodeJob, Encoder, Prober, ToolRegistry};
use lazyhls_common::{Error, Result, VideoInfo};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Prober returning a fixed duration and counting invocations.
pub struct FakeProber {
    pub duration: f64,
    pub delay: Duration,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeProber {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            delay: Duration::ZERO,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(25.0)
        }
    }

    pub fn slow(duration: f64, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(duration)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, _path: &std::path::Path) -> Result<VideoInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(Error::probe("ffprobe exited with status 1: Invalid data found"));
        }
        let mut info = VideoInfo::with_duration(self.duration);
        info.width = 1280;
        info.height = 720;
        info.codec = "h264".to_string();
        info.bitrate = 2_000_000;
        info.size = 6_250_000;
        Ok(info)
    }
}

/// What the fake encoder does when invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderMode {
    /// Write a small file describing the job.
    Write,
    /// Fail with a transcode error.
    Fail,
    /// Report success without writing anything.
    NoOutput,
}

/// Encoder writing a text payload instead of MPEG-TS.
pub struct FakeEncoder {
    pub mode: EncoderMode,
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub jobs: Mutex<Vec<EncodeJob>>,
}

impl FakeEncoder {
    pub fn new(mode: EncoderMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(mode: EncoderMode, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(mode)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Payload written for a job, so tests can check which window was encoded.
    pub fn payload(job: &EncodeJob) -> String {
        format!(
            "segment {} offset {:.3} duration {:.3}",
            job.plan.index, job.plan.target, job.plan.duration
        )
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().push(job.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.mode {
            EncoderMode::Write => {
                tokio::fs::write(&job.output, Self::payload(job)).await?;
                Ok(())
            }
            EncoderMode::Fail => Err(Error::transcode(
                job.plan.index,
                "ffmpeg exited with status 1: Conversion failed!",
            )),
            EncoderMode::NoOutput => Ok(()),
        }
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub prober: Arc<FakeProber>,
    pub encoder: Arc<FakeEncoder>,
    pub cache: TempDir,
    pub media: TempDir,
}

impl TestHarness {
    /// 25 second source, encoder that succeeds immediately.
    pub fn new() -> Self {
        Self::with_fakes(FakeProber::new(25.0), FakeEncoder::new(EncoderMode::Write))
    }

    pub fn with_fakes(prober: FakeProber, encoder: FakeEncoder) -> Self {
        let cache = tempfile::tempdir().expect("failed to create cache dir");
        let media = tempfile::tempdir().expect("failed to create media dir");

        let mut config = Config::default();
        config.cache.dir = cache.path().to_path_buf();

        let prober = Arc::new(prober);
        let encoder = Arc::new(encoder);
        let registry = TaskRegistry::new(
            config.cache.dir.clone(),
            Arc::clone(&prober) as Arc<dyn Prober>,
            Arc::clone(&encoder) as Arc<dyn Encoder>,
        );

        let ctx = AppContext {
            config: Arc::new(config),
            registry: Arc::new(registry),
            tools: Arc::new(ToolRegistry::default()),
        };

        Self {
            ctx,
            prober,
            encoder,
            cache,
            media,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.ctx.registry
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Create a source file in the media directory.
    pub fn media_file(&self, name: &str) -> PathBuf {
        let path = self.media.path().join(name);
        std::fs::write(&path, b"not really a video").expect("failed to write media file");
        path
    }

    /// Names of the files currently in the cache directory.
    pub fn cache_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.cache.path())
            .expect("failed to read cache dir")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Helper to get response body as string
pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper to get response body as JSON
pub async fn body_to_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
