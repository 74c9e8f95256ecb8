//! Poster thumbnail extraction.

use std::path::{Path, PathBuf};

use reelforge_av::{Encoder, StagedFile, ThumbnailSettings};
use reelforge_common::paths::thumbnail_path;
use reelforge_common::VideoId;
use tracing::{debug, info, warn};

use super::events::PipelineEvent;
use super::JobContext;

/// Outcome of a [`ThumbnailJob`].
#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailResult {
    Created(PathBuf),
    EncodeFailed(String),
}

/// Grab one frame from the source and attach it to the video.
///
/// The frame travels from the encoder's stdout straight into the staged
/// output file; it is never written to a scratch file and read back.
/// Unlike renditions, thumbnails are regenerated on every run.
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub video_id: VideoId,
    pub source: PathBuf,
    pub settings: ThumbnailSettings,
}

impl ThumbnailJob {
    pub fn target(&self) -> PathBuf {
        thumbnail_path(&self.source)
    }

    pub async fn run(&self, ctx: &JobContext) -> ThumbnailResult {
        match self.produce(ctx).await {
            Ok(path) => {
                info!(video_id = %self.video_id, path = %path.display(), "Thumbnail created");
                self.record(ctx, &path);
                ThumbnailResult::Created(path)
            }
            Err(e) => {
                warn!(
                    video_id = %self.video_id,
                    source = %self.source.display(),
                    error = %e,
                    "Thumbnail extraction failed"
                );
                ctx.events.publish(PipelineEvent::ThumbnailFailed {
                    video_id: self.video_id,
                    error: e.to_string(),
                });
                ThumbnailResult::EncodeFailed(e.to_string())
            }
        }
    }

    async fn produce(&self, ctx: &JobContext) -> reelforge_av::Result<PathBuf> {
        let frame = ctx.encoder.extract_frame(&self.source, &self.settings).await?;

        let mut staged = StagedFile::new(self.target())?;
        staged.write_all(&frame)?;
        staged.finalize()
    }

    fn record(&self, ctx: &JobContext, path: &Path) {
        if !ctx.source_is_current(self.video_id, &self.source) {
            return;
        }

        match ctx.catalog.set_thumbnail(self.video_id, path) {
            Ok(()) => {
                ctx.events.publish(PipelineEvent::ThumbnailReady {
                    video_id: self.video_id,
                    path: path.to_path_buf(),
                });
            }
            Err(e) if e.is_not_found() => {
                debug!(video_id = %self.video_id, "Video is gone, thumbnail not attached");
            }
            Err(e) => {
                warn!(video_id = %self.video_id, error = %e, "Failed to attach thumbnail");
            }
        }
    }
}
