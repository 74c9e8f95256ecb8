//! Pipeline progress events.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel. Publishing never
//! blocks and never fails; events sent with no subscribers are dropped.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use reelforge_common::{RenditionProfile, VideoId};
use serde::Serialize;
use tokio::sync::broadcast;

/// Default broadcast buffer size.
const DEFAULT_CAPACITY: usize = 256;

/// Something observable happened in a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Probing succeeded and jobs are about to be submitted.
    DispatchStarted {
        video_id: VideoId,
        duration_secs: f64,
    },
    /// Probing failed; no jobs were submitted.
    ProbeFailed { video_id: VideoId, error: String },
    /// A rendition was recorded (freshly encoded or already on disk).
    RenditionReady {
        video_id: VideoId,
        profile: RenditionProfile,
        path: PathBuf,
    },
    RenditionFailed {
        video_id: VideoId,
        profile: RenditionProfile,
        error: String,
    },
    ThumbnailReady { video_id: VideoId, path: PathBuf },
    ThumbnailFailed { video_id: VideoId, error: String },
}

impl PipelineEvent {
    pub fn video_id(&self) -> VideoId {
        match self {
            Self::DispatchStarted { video_id, .. }
            | Self::ProbeFailed { video_id, .. }
            | Self::RenditionReady { video_id, .. }
            | Self::RenditionFailed { video_id, .. }
            | Self::ThumbnailReady { video_id, .. }
            | Self::ThumbnailFailed { video_id, .. } => *video_id,
        }
    }
}

/// A published event with the time it was observed.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: PipelineEvent,
}

/// Cloneable publisher for pipeline events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, payload: PipelineEvent) {
        let event = Event {
            timestamp: Utc::now(),
            payload,
        };
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
