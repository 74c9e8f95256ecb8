//! Turns catalog events into pipeline runs.
//!
//! Per video the trigger moves `NoVideo -> VideoPresent -> Dispatched`. A run
//! starts when a video is created with a source, or when its source changes
//! to a different non-empty path. Saves that keep the same source never
//! dispatch again. Clearing the source or deleting the video drops it back
//! out of `Dispatched`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use reelforge_common::VideoId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::{DispatchError, DispatchReport, JobDispatcher, SourceRef};
use crate::catalog::VideoEvent;

pub struct PipelineTrigger {
    dispatcher: Arc<JobDispatcher>,
    /// Last source path dispatched per video.
    dispatched: Mutex<HashMap<VideoId, PathBuf>>,
}

impl PipelineTrigger {
    pub fn new(dispatcher: Arc<JobDispatcher>) -> Self {
        Self {
            dispatcher,
            dispatched: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `event` calls for a pipeline run, and on which file.
    pub fn decide(event: &VideoEvent) -> Option<SourceRef> {
        let (video_id, source) = match event {
            VideoEvent::Created {
                video_id,
                source_path,
            } => (*video_id, source_path.as_deref()?),
            VideoEvent::Updated {
                video_id,
                previous_path,
                source_path,
            } => {
                let source = source_path.as_deref()?;
                if previous_path.as_deref() == Some(source) {
                    return None;
                }
                (*video_id, source)
            }
            VideoEvent::Deleted { .. } => return None,
        };

        if source.is_empty() {
            return None;
        }

        Some(SourceRef {
            video_id,
            path: PathBuf::from(source),
        })
    }

    /// React to one catalog event.
    ///
    /// Returns `None` when the event does not start a run.
    pub async fn handle(
        &self,
        event: VideoEvent,
    ) -> Option<Result<DispatchReport, DispatchError>> {
        if Self::releases_source(&event)
            && self.dispatched.lock().remove(&event.video_id()).is_some()
        {
            debug!(video_id = %event.video_id(), "Forgot dispatched source");
        }

        let Some(source) = Self::decide(&event) else {
            debug!(video_id = %event.video_id(), "No new source, not dispatching");
            return None;
        };

        {
            let mut dispatched = self.dispatched.lock();
            if dispatched.get(&source.video_id) == Some(&source.path) {
                debug!(
                    video_id = %source.video_id,
                    source = %source.path.display(),
                    "Source already dispatched"
                );
                return None;
            }
            dispatched.insert(source.video_id, source.path.clone());
        }

        let result = self.dispatcher.dispatch(&source).await;
        if let Err(ref e) = result {
            warn!(video_id = %source.video_id, error = %e, "Pipeline run not started");
            // Back to VideoPresent so a later change can retry.
            let mut dispatched = self.dispatched.lock();
            if dispatched.get(&source.video_id) == Some(&source.path) {
                dispatched.remove(&source.video_id);
            }
        }

        Some(result)
    }

    /// Source last dispatched for `video_id`, if it is still tracked.
    pub fn dispatched_source(&self, video_id: VideoId) -> Option<PathBuf> {
        self.dispatched.lock().get(&video_id).cloned()
    }

    /// Whether `event` leaves the video without a source to track.
    fn releases_source(event: &VideoEvent) -> bool {
        match event {
            VideoEvent::Deleted { .. } => true,
            VideoEvent::Updated { source_path, .. } => {
                source_path.as_deref().map_or(true, str::is_empty)
            }
            VideoEvent::Created { .. } => false,
        }
    }

    /// Consume catalog events until the channel closes or `cancel` fires.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<VideoEvent>,
        cancel: CancellationToken,
    ) {
        info!("Pipeline trigger started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle(event).await;
                    }
                    None => break,
                },
            }
        }

        info!("Pipeline trigger stopped");
    }
}
