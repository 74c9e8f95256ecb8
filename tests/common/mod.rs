//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a full [`PipelineService`] to an
//! in-memory database, a temporary upload directory, and fake probe/encoder
//! backends that record how often they were called.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use reelforge::catalog::Catalog;
use reelforge::config::Config;
use reelforge::pipeline::{ConvertableStore, EventBus, JobContext};
use reelforge::service::PipelineService;
use reelforge_av::{EncodeSettings, Encoder, MediaProbe, ProbeError, ThumbnailSettings};
use reelforge_db::pool::{init_memory_pool, DbPool};

/// Probe that returns a fixed duration, or fails.
pub struct FakeProbe {
    duration: Option<f64>,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn returning(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            duration: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn duration(&self, source: &Path) -> Result<f64, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !source.exists() {
            return Err(ProbeError::NotFound {
                path: source.to_path_buf(),
            });
        }
        self.duration
            .ok_or_else(|| ProbeError::ParseFailure("no duration in output".to_string()))
    }
}

/// Encoder that writes small placeholder files.
///
/// Resolutions listed in `failing` simulate a crashed encode: a partial file
/// is written and an error returned. A gated encoder holds every encode and
/// frame grab until the test adds a permit per call.
#[derive(Default)]
pub struct FakeEncoder {
    failing: HashSet<String>,
    gate: Option<Arc<Semaphore>>,
    encodes: Mutex<Vec<(PathBuf, String)>>,
    frames: AtomicUsize,
}

impl FakeEncoder {
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let encoder = Self {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        (encoder, gate)
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
    }

    pub fn failing_on(resolution: &str) -> Self {
        Self {
            failing: HashSet::from([resolution.to_string()]),
            ..Default::default()
        }
    }

    /// Number of rendition encodes attempted.
    pub fn encode_count(&self) -> usize {
        self.encodes.lock().len()
    }

    /// Encodes attempted for one resolution.
    pub fn encodes_of(&self, resolution: &str) -> usize {
        self.encodes
            .lock()
            .iter()
            .filter(|(_, r)| r == resolution)
            .count()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode_rendition(
        &self,
        source: &Path,
        settings: &EncodeSettings,
        output: &Path,
    ) -> reelforge_av::Result<()> {
        self.wait_for_gate().await;
        self.encodes
            .lock()
            .push((source.to_path_buf(), settings.resolution.clone()));

        if self.failing.contains(&settings.resolution) {
            std::fs::write(output, b"truncated")?;
            return Err(reelforge_av::Error::tool_failed(
                "ffmpeg",
                "exit status: 1",
            ));
        }

        tokio::task::yield_now().await;
        std::fs::write(output, format!("{} {}", source.display(), settings.resolution))?;
        Ok(())
    }

    async fn extract_frame(
        &self,
        _source: &Path,
        _settings: &ThumbnailSettings,
    ) -> reelforge_av::Result<Vec<u8>> {
        self.wait_for_gate().await;
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(b"RIFF\x00\x00\x00\x00WEBPVP8 ".to_vec())
    }
}

/// Full pipeline over an in-memory database and a temp upload directory.
pub struct TestHarness {
    pub dir: TempDir,
    pub db: DbPool,
    pub config: Config,
    pub probe: Arc<FakeProbe>,
    pub encoder: Arc<FakeEncoder>,
    pub catalog: Catalog,
    pub store: ConvertableStore,
    service: Option<PipelineService>,
}

impl TestHarness {
    /// Harness whose probe reports 97.5 seconds.
    pub fn new() -> Self {
        Self::with_backends(FakeProbe::returning(97.5), FakeEncoder::default())
    }

    pub fn with_backends(probe: FakeProbe, encoder: FakeEncoder) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let db = init_memory_pool().expect("failed to create in-memory pool");

        let mut config = Config::default();
        config.pipeline.workers = 3;

        let probe = Arc::new(probe);
        let encoder = Arc::new(encoder);
        let service =
            PipelineService::with_backends(&config, db.clone(), probe.clone(), encoder.clone());

        Self {
            dir,
            catalog: service.catalog().clone(),
            store: service.store().clone(),
            db,
            config,
            probe,
            encoder,
            service: Some(service),
        }
    }

    pub fn service(&mut self) -> &mut PipelineService {
        self.service.as_mut().expect("service already drained")
    }

    /// Create a source file in the upload directory.
    pub fn source(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"source video").expect("failed to write source");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Wait for every queued job, then start a fresh service on the same
    /// database and backends.
    pub async fn drain(&mut self) {
        if let Some(service) = self.service.take() {
            service.shutdown().await;
        }
        let service = PipelineService::with_backends(
            &self.config,
            self.db.clone(),
            self.probe.clone(),
            self.encoder.clone(),
        );
        self.catalog = service.catalog().clone();
        self.store = service.store().clone();
        self.service = Some(service);
    }

    /// Job context sharing this harness's database and encoder.
    pub fn job_context(&self) -> JobContext {
        JobContext {
            encoder: self.encoder.clone(),
            store: self.store.clone(),
            catalog: self.catalog.clone(),
            events: EventBus::default(),
        }
    }
}
