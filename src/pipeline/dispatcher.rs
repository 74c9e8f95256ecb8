//! Fan one source video out into its pipeline jobs.

use std::path::PathBuf;
use std::sync::Arc;

use reelforge_av::{MediaProbe, ProbeError, ThumbnailSettings};
use reelforge_common::{ConvertablesId, RenditionProfile, VideoId};
use serde::Serialize;
use tracing::{info, warn};

use super::events::PipelineEvent;
use super::pool::{PipelineJob, PoolClosed, PoolHandle};
use super::rendition::RenditionJob;
use super::store::StoreError;
use super::thumbnail::ThumbnailJob;
use super::JobContext;
use crate::config::ProfilesConfig;

/// The file a pipeline run works from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub video_id: VideoId,
    pub path: PathBuf,
}

/// Why a run submitted no (or not all) jobs.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("video {0} no longer exists")]
    VideoGone(VideoId),

    #[error("video {0} has no source file")]
    NoSource(VideoId),

    #[error("database error: {0}")]
    Database(String),

    #[error(transparent)]
    PoolClosed(#[from] PoolClosed),
}

/// What a successful dispatch did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub video_id: VideoId,
    pub convertables_id: ConvertablesId,
    pub duration_secs: f64,
    pub jobs_submitted: usize,
}

/// Probes a source, records its duration, and submits its jobs.
pub struct JobDispatcher {
    probe: Arc<dyn MediaProbe>,
    ctx: JobContext,
    profiles: Arc<ProfilesConfig>,
    thumbnail: ThumbnailSettings,
    pool: PoolHandle,
}

impl JobDispatcher {
    pub fn new(
        probe: Arc<dyn MediaProbe>,
        ctx: JobContext,
        profiles: Arc<ProfilesConfig>,
        thumbnail: ThumbnailSettings,
        pool: PoolHandle,
    ) -> Self {
        Self {
            probe,
            ctx,
            profiles,
            thumbnail,
            pool,
        }
    }

    /// Run one dispatch for `source`.
    ///
    /// Only the probe is awaited. A probe failure aborts the run before any
    /// record is created or job submitted. On success this returns as soon as
    /// every job is queued, not when they finish.
    pub async fn dispatch(&self, source: &SourceRef) -> Result<DispatchReport, DispatchError> {
        let video_id = source.video_id;
        info!(video_id = %video_id, source = %source.path.display(), "Dispatching pipeline run");

        let duration_secs = match self.probe.duration(&source.path).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!(
                    video_id = %video_id,
                    source = %source.path.display(),
                    probe = self.probe.name(),
                    error = %e,
                    "Probe failed, nothing dispatched"
                );
                self.ctx.events.publish(PipelineEvent::ProbeFailed {
                    video_id,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        self.ctx
            .catalog
            .set_duration(video_id, duration_secs)
            .map_err(|e| store_error(video_id, e.into()))?;

        let record = self
            .ctx
            .store
            .get_or_create(video_id)
            .map_err(|e| store_error(video_id, e))?;

        self.ctx.events.publish(PipelineEvent::DispatchStarted {
            video_id,
            duration_secs,
        });

        let mut jobs_submitted = 0;
        for profile in RenditionProfile::ALL {
            let job = RenditionJob {
                video_id,
                convertables_id: record.id,
                source: source.path.clone(),
                profile,
                settings: self.profiles.settings(profile).clone(),
            };
            self.pool.submit(PipelineJob::Rendition(job)).await?;
            jobs_submitted += 1;
        }

        let thumbnail = ThumbnailJob {
            video_id,
            source: source.path.clone(),
            settings: self.thumbnail.clone(),
        };
        self.pool.submit(PipelineJob::Thumbnail(thumbnail)).await?;
        jobs_submitted += 1;

        info!(
            video_id = %video_id,
            duration_secs,
            jobs = jobs_submitted,
            "Pipeline jobs submitted"
        );

        Ok(DispatchReport {
            video_id,
            convertables_id: record.id,
            duration_secs,
            jobs_submitted,
        })
    }

    /// Re-dispatch an existing video from its current source.
    ///
    /// Renditions already on disk come back as skipped, so only missing or
    /// previously failed ones are encoded.
    pub async fn rerun(&self, video_id: VideoId) -> Result<DispatchReport, DispatchError> {
        let video = self
            .ctx
            .catalog
            .get_video(video_id)
            .map_err(|e| store_error(video_id, e.into()))?
            .ok_or(DispatchError::VideoGone(video_id))?;

        let path = video.source().ok_or(DispatchError::NoSource(video_id))?;

        self.dispatch(&SourceRef {
            video_id,
            path: PathBuf::from(path),
        })
        .await
    }
}

fn store_error(video_id: VideoId, err: StoreError) -> DispatchError {
    match err {
        StoreError::NotFound(_) => DispatchError::VideoGone(video_id),
        StoreError::Database(msg) => DispatchError::Database(msg),
    }
}
