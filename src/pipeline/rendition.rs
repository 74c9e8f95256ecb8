//! One rendition encode for one profile.

use std::path::{Path, PathBuf};

use reelforge_av::{EncodeSettings, Encoder, StagedFile};
use reelforge_common::paths::rendition_path;
use reelforge_common::{ConvertablesId, RenditionProfile, VideoId};
use tracing::{debug, info, warn};

use super::events::PipelineEvent;
use super::JobContext;

/// Outcome of a [`RenditionJob`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenditionResult {
    /// The encoder ran and produced the target file.
    Created(PathBuf),
    /// The target already existed; the encoder was not invoked.
    Skipped(PathBuf),
    /// The encoder failed. Nothing was recorded.
    EncodeFailed(String),
}

impl RenditionResult {
    /// Path of the rendition, unless the encode failed.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Created(p) | Self::Skipped(p) => Some(p),
            Self::EncodeFailed(_) => None,
        }
    }
}

/// Produce the `profile` rendition of `source` and record it.
///
/// The target path is a pure function of source and profile, which is what
/// makes re-running the job safe.
#[derive(Debug, Clone)]
pub struct RenditionJob {
    pub video_id: VideoId,
    pub convertables_id: ConvertablesId,
    pub source: PathBuf,
    pub profile: RenditionProfile,
    pub settings: EncodeSettings,
}

impl RenditionJob {
    pub fn target(&self) -> PathBuf {
        rendition_path(&self.source, self.profile)
    }

    pub async fn run(&self, ctx: &JobContext) -> RenditionResult {
        let target = self.target();

        let result = if target.exists() {
            debug!(
                video_id = %self.video_id,
                profile = %self.profile,
                path = %target.display(),
                "Rendition already exists, skipping encode"
            );
            RenditionResult::Skipped(target)
        } else {
            match self.encode(&*ctx.encoder, &target).await {
                Ok(()) => {
                    info!(
                        video_id = %self.video_id,
                        profile = %self.profile,
                        path = %target.display(),
                        "Rendition encoded"
                    );
                    RenditionResult::Created(target)
                }
                Err(e) => {
                    warn!(
                        video_id = %self.video_id,
                        profile = %self.profile,
                        source = %self.source.display(),
                        error = %e,
                        "Rendition encode failed"
                    );
                    RenditionResult::EncodeFailed(e.to_string())
                }
            }
        };

        match &result {
            RenditionResult::Created(path) | RenditionResult::Skipped(path) => {
                self.record(ctx, path);
            }
            RenditionResult::EncodeFailed(error) => {
                ctx.events.publish(PipelineEvent::RenditionFailed {
                    video_id: self.video_id,
                    profile: self.profile,
                    error: error.clone(),
                });
            }
        }

        result
    }

    /// Encode into a staged file beside the target and move it into place
    /// only after the encoder succeeded.
    async fn encode(&self, encoder: &dyn Encoder, target: &Path) -> reelforge_av::Result<()> {
        let staged = StagedFile::new(target)?;
        encoder
            .encode_rendition(&self.source, &self.settings, staged.path())
            .await?;
        staged.finalize()?;
        Ok(())
    }

    fn record(&self, ctx: &JobContext, path: &Path) {
        if !ctx.source_is_current(self.video_id, &self.source) {
            return;
        }

        match ctx.store.update_field(self.convertables_id, self.profile, path) {
            Ok(()) => {
                ctx.events.publish(PipelineEvent::RenditionReady {
                    video_id: self.video_id,
                    profile: self.profile,
                    path: path.to_path_buf(),
                });
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    video_id = %self.video_id,
                    profile = %self.profile,
                    "Convertables record is gone, nothing to update"
                );
            }
            Err(e) => {
                warn!(
                    video_id = %self.video_id,
                    profile = %self.profile,
                    error = %e,
                    "Failed to record rendition"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{context, StubEncoder};
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn job_for(ctx: &JobContext, source: &Path, profile: RenditionProfile) -> RenditionJob {
        let video = ctx.catalog.create_video("Movie", Some(source)).unwrap();
        let record = ctx.store.get_or_create(video.id).unwrap();
        RenditionJob {
            video_id: video.id,
            convertables_id: record.id,
            source: source.to_path_buf(),
            profile,
            settings: EncodeSettings::with_resolution("hd720"),
        }
    }

    #[tokio::test]
    async fn existing_target_is_skipped_and_recorded() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("movie.mp4");
        std::fs::write(&source, b"src").unwrap();
        std::fs::write(dir.path().join("movie_720p.mp4"), b"done").unwrap();

        let encoder = Arc::new(StubEncoder::default());
        let (ctx, _pool) = context(encoder.clone());
        let job = job_for(&ctx, &source, RenditionProfile::P720);

        let result = job.run(&ctx).await;

        assert_eq!(result, RenditionResult::Skipped(job.target()));
        assert_eq!(encoder.encodes.load(Ordering::SeqCst), 0);
        let record = ctx.store.get_for_video(job.video_id).unwrap().unwrap();
        assert_eq!(record.rendition(RenditionProfile::P720), job.target().to_str());
    }

    #[tokio::test]
    async fn failed_encode_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("movie.mp4");
        std::fs::write(&source, b"src").unwrap();

        let encoder = Arc::new(StubEncoder {
            failing_resolutions: HashSet::from(["hd720".to_string()]),
            ..Default::default()
        });
        let (ctx, _pool) = context(encoder);
        let job = job_for(&ctx, &source, RenditionProfile::P720);

        let result = job.run(&ctx).await;

        assert!(matches!(result, RenditionResult::EncodeFailed(_)));
        assert!(!job.target().exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        let record = ctx.store.get_for_video(job.video_id).unwrap().unwrap();
        assert!(record.rendition(RenditionProfile::P720).is_none());
    }

    #[tokio::test]
    async fn replaced_source_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("movie.mp4");
        std::fs::write(&source, b"src").unwrap();

        let (ctx, _pool) = context(Arc::new(StubEncoder::default()));
        let job = job_for(&ctx, &source, RenditionProfile::P120);
        ctx.catalog
            .replace_source(job.video_id, &dir.path().join("movie2.mp4"))
            .unwrap();

        let result = job.run(&ctx).await;

        assert_eq!(result, RenditionResult::Created(job.target()));
        assert!(job.target().exists());
        let record = ctx.store.get_for_video(job.video_id).unwrap().unwrap();
        assert!(record.rendition(RenditionProfile::P120).is_none());
    }
}
