//! Catalog write path.
//!
//! The catalog owns the `videos` table. Every mutation that can change which
//! file backs a video goes through here and emits a [`VideoEvent`], which the
//! pipeline trigger consumes. Pipeline write-backs (duration, thumbnail) use
//! the same type but never emit events.

use std::path::Path;

use reelforge_common::{Error, Result, VideoId};
use reelforge_db::models::SourceVideo;
use reelforge_db::pool::{get_conn, DbPool};
use reelforge_db::queries::videos;
use tokio::sync::mpsc;

/// A change to a video's backing file, as observed by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoEvent {
    /// A video row was inserted.
    Created {
        video_id: VideoId,
        source_path: Option<String>,
    },
    /// A video row was saved. `previous_path` is the source it had before.
    Updated {
        video_id: VideoId,
        previous_path: Option<String>,
        source_path: Option<String>,
    },
    /// A video row was removed.
    Deleted { video_id: VideoId },
}

impl VideoEvent {
    pub fn video_id(&self) -> VideoId {
        match self {
            Self::Created { video_id, .. }
            | Self::Updated { video_id, .. }
            | Self::Deleted { video_id } => *video_id,
        }
    }
}

/// Handle to the video catalog.
#[derive(Clone)]
pub struct Catalog {
    pool: DbPool,
    events: mpsc::UnboundedSender<VideoEvent>,
}

impl Catalog {
    /// Create a catalog and the receiving end of its event stream.
    pub fn new(pool: DbPool) -> (Self, mpsc::UnboundedReceiver<VideoEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { pool, events }, rx)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Register a new video.
    pub fn create_video(&self, title: &str, source_path: Option<&Path>) -> Result<SourceVideo> {
        let source = source_path.map(path_string).transpose()?;
        let conn = get_conn(&self.pool)?;
        let video = videos::create_video(&conn, title, source.as_deref())?;

        tracing::debug!(video_id = %video.id, source = ?video.source_path, "Video created");
        self.emit(VideoEvent::Created {
            video_id: video.id,
            source_path: video.source_path.clone(),
        });

        Ok(video)
    }

    /// Persist the catalog fields of `video` (title and source path).
    ///
    /// Always emits an `Updated` event; the trigger decides whether the
    /// source actually changed.
    pub fn save_video(&self, video: &SourceVideo) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        let previous_path =
            videos::update_video(&conn, video.id, &video.title, video.source_path.as_deref())?;

        self.emit(VideoEvent::Updated {
            video_id: video.id,
            previous_path,
            source_path: video.source_path.clone(),
        });

        Ok(())
    }

    /// Point an existing video at a new source file.
    pub fn replace_source(&self, id: VideoId, source_path: &Path) -> Result<SourceVideo> {
        let mut video = self
            .get_video(id)?
            .ok_or_else(|| Error::not_found(format!("video {id}")))?;

        video.source_path = Some(path_string(source_path)?);
        self.save_video(&video)?;

        tracing::info!(video_id = %id, source = %source_path.display(), "Video source replaced");
        Ok(video)
    }

    /// Delete a video. Its convertables record is removed with it; derived
    /// files on disk are left alone.
    pub fn delete_video(&self, id: VideoId) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        let deleted = videos::delete_video(&conn, id)?;
        if deleted {
            self.emit(VideoEvent::Deleted { video_id: id });
        }
        Ok(deleted)
    }

    pub fn get_video(&self, id: VideoId) -> Result<Option<SourceVideo>> {
        let conn = get_conn(&self.pool)?;
        videos::get_video(&conn, id)
    }

    pub fn list_videos(&self) -> Result<Vec<SourceVideo>> {
        let conn = get_conn(&self.pool)?;
        videos::list_videos(&conn)
    }

    pub fn find_by_source_path(&self, source_path: &Path) -> Result<Option<SourceVideo>> {
        let conn = get_conn(&self.pool)?;
        videos::find_by_source_path(&conn, &path_string(source_path)?)
    }

    /// Record the probed duration. Does not emit an event.
    pub fn set_duration(&self, id: VideoId, duration_secs: f64) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        videos::set_duration(&conn, id, duration_secs)
    }

    /// Record the poster thumbnail path. Does not emit an event.
    pub fn set_thumbnail(&self, id: VideoId, path: &Path) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        videos::set_thumbnail_path(&conn, id, &path_string(path)?)
    }

    fn emit(&self, event: VideoEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("No pipeline trigger is listening for catalog events");
        }
    }
}

fn path_string(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_input(format!("Path is not valid UTF-8: {:?}", path)))
}
