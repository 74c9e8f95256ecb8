//! Wiring for a complete pipeline instance.

use std::path::PathBuf;
use std::sync::Arc;

use reelforge_av::tools::get_tool_path;
use reelforge_av::{Encoder, FfmpegEncoder, FfprobeProbe, MediaProbe};
use reelforge_common::VideoId;
use reelforge_db::pool::DbPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, VideoEvent};
use crate::config::Config;
use crate::pipeline::{
    ConvertableStore, DispatchError, DispatchReport, EventBus, JobContext, JobDispatcher,
    PipelineTrigger, WorkerPool,
};

/// Catalog, trigger, dispatcher and worker pool sharing one database.
///
/// Must be created inside a Tokio runtime because the worker pool spawns its
/// tasks immediately.
pub struct PipelineService {
    catalog: Catalog,
    store: ConvertableStore,
    events: EventBus,
    dispatcher: Arc<JobDispatcher>,
    trigger: Arc<PipelineTrigger>,
    pool: WorkerPool,
    catalog_events: Option<mpsc::UnboundedReceiver<VideoEvent>>,
}

impl PipelineService {
    /// Build a service backed by the real ffprobe and ffmpeg binaries.
    pub fn new(config: &Config, db: DbPool) -> Self {
        let timeout = config.pipeline.job_timeout();
        let ffprobe = resolve_tool("ffprobe", config.tools.ffprobe_path.as_deref());
        let ffmpeg = resolve_tool("ffmpeg", config.tools.ffmpeg_path.as_deref());

        Self::with_backends(
            config,
            db,
            Arc::new(FfprobeProbe::new(ffprobe, timeout)),
            Arc::new(FfmpegEncoder::new(ffmpeg, timeout)),
        )
    }

    /// Build a service with explicit probe and encoder implementations.
    pub fn with_backends(
        config: &Config,
        db: DbPool,
        probe: Arc<dyn MediaProbe>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        let (catalog, catalog_events) = Catalog::new(db.clone());
        let store = ConvertableStore::new(db);
        let events = EventBus::default();

        let ctx = JobContext {
            encoder,
            store: store.clone(),
            catalog: catalog.clone(),
            events: events.clone(),
        };

        let pool = WorkerPool::new(
            config.pipeline.workers,
            config.pipeline.queue_capacity,
            ctx.clone(),
        );

        let dispatcher = Arc::new(JobDispatcher::new(
            probe,
            ctx,
            Arc::new(config.profiles.clone()),
            config.thumbnail.clone(),
            pool.handle(),
        ));
        let trigger = Arc::new(PipelineTrigger::new(dispatcher.clone()));

        Self {
            catalog,
            store,
            events,
            dispatcher,
            trigger,
            pool,
            catalog_events: Some(catalog_events),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &ConvertableStore {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn trigger(&self) -> &Arc<PipelineTrigger> {
        &self.trigger
    }

    /// Start consuming catalog events in the background.
    ///
    /// Returns `None` if the event stream was already taken.
    pub fn spawn_trigger(&mut self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let events = self.catalog_events.take()?;
        let trigger = self.trigger.clone();
        Some(tokio::spawn(trigger.run(events, cancel)))
    }

    /// Feed every catalog event emitted so far through the trigger.
    ///
    /// For callers that drive the pipeline without a background trigger.
    pub async fn process_pending(&mut self) -> Vec<Result<DispatchReport, DispatchError>> {
        let mut results = Vec::new();
        let Some(events) = self.catalog_events.as_mut() else {
            return results;
        };

        let mut pending = Vec::new();
        while let Ok(event) = events.try_recv() {
            pending.push(event);
        }

        for event in pending {
            if let Some(result) = self.trigger.handle(event).await {
                results.push(result);
            }
        }

        results
    }

    /// Operator re-run of an existing video.
    pub async fn rerun(&self, video_id: VideoId) -> Result<DispatchReport, DispatchError> {
        self.dispatcher.rerun(video_id).await
    }

    /// Wait for every queued job to finish, then stop the workers.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}

fn resolve_tool(name: &str, configured: Option<&std::path::Path>) -> PathBuf {
    get_tool_path(name, configured).unwrap_or_else(|e| {
        tracing::warn!(tool = name, error = %e, "Tool not found, relying on PATH at run time");
        PathBuf::from(name)
    })
}
