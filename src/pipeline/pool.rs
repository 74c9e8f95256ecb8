//! Bounded worker pool for pipeline jobs.
//!
//! N worker tasks share one bounded queue. Submission waits while the queue
//! is full; nothing waits for a job to finish. Jobs carry no ordering
//! relative to each other.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::rendition::RenditionJob;
use super::thumbnail::ThumbnailJob;
use super::JobContext;

/// A unit of work for the pool.
#[derive(Debug, Clone)]
pub enum PipelineJob {
    Rendition(RenditionJob),
    Thumbnail(ThumbnailJob),
}

impl PipelineJob {
    async fn run(self, ctx: &JobContext) {
        match self {
            Self::Rendition(job) => {
                job.run(ctx).await;
            }
            Self::Thumbnail(job) => {
                job.run(ctx).await;
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Rendition(job) => format!("rendition {} of {}", job.profile, job.video_id),
            Self::Thumbnail(job) => format!("thumbnail of {}", job.video_id),
        }
    }
}

/// The pool no longer accepts jobs.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("worker pool is shut down")]
pub struct PoolClosed;

type SharedSender = Arc<RwLock<Option<mpsc::Sender<PipelineJob>>>>;

/// Cloneable submission handle.
///
/// Handles do not keep the pool alive: once [`WorkerPool::shutdown`] runs,
/// every handle starts returning [`PoolClosed`].
#[derive(Clone)]
pub struct PoolHandle {
    sender: SharedSender,
}

impl PoolHandle {
    /// Queue `job`, waiting for space if the queue is full.
    pub async fn submit(&self, job: PipelineJob) -> Result<(), PoolClosed> {
        let sender = self.sender.read().clone().ok_or(PoolClosed)?;
        sender.send(job).await.map_err(|_| PoolClosed)
    }
}

/// Owner of the worker tasks.
pub struct WorkerPool {
    sender: SharedSender,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks consuming a queue of `queue_capacity` jobs.
    ///
    /// Must be called from within a Tokio runtime. Zero values are raised to 1.
    pub fn new(workers: usize, queue_capacity: usize, ctx: JobContext) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers)
            .map(|id| {
                let rx = rx.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    worker_loop(id, rx, ctx).await;
                })
            })
            .collect();

        info!(workers, queue_capacity, "Worker pool started");

        Self {
            sender: Arc::new(RwLock::new(Some(tx))),
            workers: handles,
        }
    }

    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            sender: self.sender.clone(),
        }
    }

    pub async fn submit(&self, job: PipelineJob) -> Result<(), PoolClosed> {
        self.handle().submit(job).await
    }

    /// Stop accepting jobs, let the workers drain everything already queued,
    /// and wait for them to exit.
    pub async fn shutdown(self) {
        self.sender.write().take();

        for handle in self.workers {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }

        info!("Worker pool stopped");
    }
}

async fn worker_loop(worker_id: usize, rx: Arc<Mutex<mpsc::Receiver<PipelineJob>>>, ctx: JobContext) {
    debug!(worker_id, "Worker started");

    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else { break };

        let description = job.describe();
        debug!(worker_id, job = %description, "Running job");

        // A panicking job takes down its own task, not the worker.
        let job_ctx = ctx.clone();
        if let Err(e) = tokio::spawn(async move { job.run(&job_ctx).await }).await {
            error!(worker_id, job = %description, "Job panicked: {}", e);
        }
    }

    debug!(worker_id, "Worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{context, StubEncoder};
    use reelforge_av::ThumbnailSettings;
    use reelforge_common::VideoId;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn thumbnail_job(source: std::path::PathBuf) -> PipelineJob {
        PipelineJob::Thumbnail(ThumbnailJob {
            video_id: VideoId::new(),
            source,
            settings: ThumbnailSettings::default(),
        })
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(StubEncoder::default());
        let (ctx, _pool) = context(encoder.clone());

        let pool = WorkerPool::new(2, 16, ctx);
        for i in 0..6 {
            let source = dir.path().join(format!("clip{i}.mp4"));
            pool.submit(thumbnail_job(source)).await.unwrap();
        }
        pool.shutdown().await;

        assert_eq!(encoder.frames.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn handles_reject_after_shutdown() {
        let (ctx, _pool) = context(Arc::new(StubEncoder::default()));
        let pool = WorkerPool::new(1, 1, ctx);
        let handle = pool.handle();

        pool.shutdown().await;

        let result = handle.submit(thumbnail_job("/tmp/none.mp4".into())).await;
        assert!(result.is_err());
    }
}
