//! The convertables aggregate as seen by pipeline jobs.

use std::path::Path;

use reelforge_common::{ConvertablesId, RenditionProfile, VideoId};
use reelforge_db::models::ConvertablesRecord;
use reelforge_db::pool::{get_conn, DbPool};
use reelforge_db::queries::{convertables, videos};

/// Store failures.
///
/// `NotFound` means the owning video (and with it the record) was deleted
/// after dispatch. Jobs treat it as "nothing to update", not as a failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reelforge_common::Error> for StoreError {
    fn from(err: reelforge_common::Error) -> Self {
        match err {
            reelforge_common::Error::NotFound(what) => Self::NotFound(what),
            other => Self::Database(other.to_string()),
        }
    }
}

/// Per-video record of which renditions exist.
///
/// Every write touches a single column, so concurrent jobs for different
/// profiles need nothing beyond SQLite's row-level write atomicity.
#[derive(Clone)]
pub struct ConvertableStore {
    pool: DbPool,
}

impl ConvertableStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Return the record for `video_id`, creating an empty one on first use.
    pub fn get_or_create(&self, video_id: VideoId) -> Result<ConvertablesRecord, StoreError> {
        let conn = get_conn(&self.pool)?;
        Ok(convertables::get_or_create(&conn, video_id)?)
    }

    pub fn get_for_video(
        &self,
        video_id: VideoId,
    ) -> Result<Option<ConvertablesRecord>, StoreError> {
        let conn = get_conn(&self.pool)?;
        Ok(convertables::get_for_video(&conn, video_id)?)
    }

    /// Record `path` as the rendition for `profile`.
    pub fn update_field(
        &self,
        id: ConvertablesId,
        profile: RenditionProfile,
        path: &Path,
    ) -> Result<(), StoreError> {
        let path = path
            .to_str()
            .ok_or_else(|| StoreError::Database(format!("Path is not valid UTF-8: {:?}", path)))?;
        let conn = get_conn(&self.pool)?;
        Ok(convertables::update_field(&conn, id, profile, path)?)
    }

    /// The source path the video currently points at.
    pub fn current_source(&self, video_id: VideoId) -> Result<Option<String>, StoreError> {
        let conn = get_conn(&self.pool)?;
        Ok(videos::source_path(&conn, video_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelforge_db::pool::init_memory_pool;

    #[test]
    fn test_update_after_video_deleted_is_not_found() {
        let pool = init_memory_pool().unwrap();
        let store = ConvertableStore::new(pool.clone());

        let conn = pool.get().unwrap();
        let video = videos::create_video(&conn, "Movie", Some("/u/movie.mp4")).unwrap();
        drop(conn);

        let record = store.get_or_create(video.id).unwrap();

        let conn = pool.get().unwrap();
        videos::delete_video(&conn, video.id).unwrap();
        drop(conn);

        let err = store
            .update_field(record.id, RenditionProfile::P120, Path::new("/u/movie_120p.mp4"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.current_source(video.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_get_or_create_for_missing_video() {
        let store = ConvertableStore::new(init_memory_pool().unwrap());
        assert!(store.get_or_create(VideoId::new()).unwrap_err().is_not_found());
    }
}
