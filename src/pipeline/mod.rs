//! The transcoding pipeline.
//!
//! A catalog event reaches the [`PipelineTrigger`], which asks the
//! [`JobDispatcher`] to probe the source and fan it out into one
//! [`RenditionJob`] per profile plus a [`ThumbnailJob`]. Jobs run on the
//! [`WorkerPool`] and record their results in the [`ConvertableStore`].

pub mod dispatcher;
pub mod events;
pub mod pool;
pub mod rendition;
pub mod store;
pub mod thumbnail;
pub mod trigger;

pub use dispatcher::{DispatchError, DispatchReport, JobDispatcher, SourceRef};
pub use events::{Event, EventBus, PipelineEvent};
pub use pool::{PipelineJob, PoolClosed, PoolHandle, WorkerPool};
pub use rendition::{RenditionJob, RenditionResult};
pub use store::{ConvertableStore, StoreError};
pub use thumbnail::{ThumbnailJob, ThumbnailResult};
pub use trigger::PipelineTrigger;

use std::path::Path;
use std::sync::Arc;

use reelforge_av::Encoder;
use reelforge_common::VideoId;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;

/// Everything a running job needs. Cheap to clone.
#[derive(Clone)]
pub struct JobContext {
    pub encoder: Arc<dyn Encoder>,
    pub store: ConvertableStore,
    pub catalog: Catalog,
    pub events: EventBus,
}

impl JobContext {
    /// Whether `source` is still the file backing `video_id`.
    ///
    /// Checked right before a job records its output. If the video has been
    /// pointed at another file in the meantime, a newer dispatch owns the
    /// record and this job's output stays on disk unrecorded. Replacing the
    /// file in place under the same path is not detected.
    pub fn source_is_current(&self, video_id: VideoId, source: &Path) -> bool {
        match self.store.current_source(video_id) {
            Ok(Some(current)) if Path::new(&current) == source => true,
            Ok(current) => {
                info!(
                    video_id = %video_id,
                    source = %source.display(),
                    current = ?current,
                    "Source changed while the job ran, output not recorded"
                );
                false
            }
            Err(e) if e.is_not_found() => {
                debug!(video_id = %video_id, "Video is gone, nothing to update");
                false
            }
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "Failed to read current source");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use reelforge_av::{EncodeSettings, Encoder, ThumbnailSettings};
    use reelforge_db::pool::{init_memory_pool, DbPool};

    use super::{ConvertableStore, EventBus, JobContext};
    use crate::catalog::Catalog;

    /// Encoder that writes placeholder bytes and counts invocations.
    #[derive(Default)]
    pub struct StubEncoder {
        pub encodes: AtomicUsize,
        pub frames: AtomicUsize,
        pub failing_resolutions: HashSet<String>,
    }

    #[async_trait]
    impl Encoder for StubEncoder {
        async fn encode_rendition(
            &self,
            _source: &Path,
            settings: &EncodeSettings,
            output: &Path,
        ) -> reelforge_av::Result<()> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            if self.failing_resolutions.contains(&settings.resolution) {
                std::fs::write(output, b"partial")?;
                return Err(reelforge_av::Error::tool_failed("ffmpeg", "exit status: 1"));
            }
            std::fs::write(output, settings.resolution.as_bytes())?;
            Ok(())
        }

        async fn extract_frame(
            &self,
            _source: &Path,
            _settings: &ThumbnailSettings,
        ) -> reelforge_av::Result<Vec<u8>> {
            self.frames.fetch_add(1, Ordering::SeqCst);
            Ok(b"RIFF....WEBP".to_vec())
        }
    }

    pub fn context(encoder: Arc<StubEncoder>) -> (JobContext, DbPool) {
        let pool = init_memory_pool().unwrap();
        let (catalog, _rx) = Catalog::new(pool.clone());
        let ctx = JobContext {
            encoder,
            store: ConvertableStore::new(pool.clone()),
            catalog,
            events: EventBus::default(),
        };
        (ctx, pool)
    }
}
