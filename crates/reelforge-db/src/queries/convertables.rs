//! Convertables record queries.
//!
//! A record is created lazily by the first pipeline run for a video and is
//! then only ever written one rendition column at a time.

use chrono::Utc;
use reelforge_common::{ConvertablesId, Error, RenditionProfile, Result, VideoId};
use rusqlite::{params, Connection, OptionalExtension};

use super::{timestamp_column, uuid_column};
use crate::models::ConvertablesRecord;

const CONVERTABLES_COLUMNS: &str =
    "id, video_id, video_120p, video_360p, video_720p, video_1080p, created_at, updated_at";

fn parse_convertables_row(row: &rusqlite::Row) -> rusqlite::Result<ConvertablesRecord> {
    Ok(ConvertablesRecord {
        id: ConvertablesId::from(uuid_column(row, 0)?),
        video_id: VideoId::from(uuid_column(row, 1)?),
        video_120p: row.get(2)?,
        video_360p: row.get(3)?,
        video_720p: row.get(4)?,
        video_1080p: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        updated_at: timestamp_column(row, 7)?,
    })
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Fetch the record for `video_id`, creating an empty one if none exists.
///
/// Concurrent callers converge on a single row: the insert is a no-op when
/// the unique `video_id` constraint already holds a record.
///
/// # Errors
///
/// `Error::NotFound` if the video does not exist.
pub fn get_or_create(conn: &Connection, video_id: VideoId) -> Result<ConvertablesRecord> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO convertables (id, video_id, created_at, updated_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(video_id) DO NOTHING",
        params![ConvertablesId::new().to_string(), video_id.to_string(), now, now],
    )
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            Error::not_found("video")
        } else {
            Error::database(e.to_string())
        }
    })?;

    get_for_video(conn, video_id)?.ok_or_else(|| Error::not_found("convertables"))
}

/// Get a record by its own ID.
pub fn get(conn: &Connection, id: ConvertablesId) -> Result<Option<ConvertablesRecord>> {
    conn.query_row(
        &format!("SELECT {CONVERTABLES_COLUMNS} FROM convertables WHERE id = ?"),
        [id.to_string()],
        parse_convertables_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Get the record belonging to a video.
pub fn get_for_video(conn: &Connection, video_id: VideoId) -> Result<Option<ConvertablesRecord>> {
    conn.query_row(
        &format!("SELECT {CONVERTABLES_COLUMNS} FROM convertables WHERE video_id = ?"),
        [video_id.to_string()],
        parse_convertables_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Set the rendition path for one profile.
///
/// Only the profile's own column is written, so updates for different
/// profiles never overwrite each other.
///
/// # Errors
///
/// `Error::NotFound` if the record no longer exists.
pub fn update_field(
    conn: &Connection,
    id: ConvertablesId,
    profile: RenditionProfile,
    path: &str,
) -> Result<()> {
    // Column names come from a closed enum, never from input.
    let sql = format!(
        "UPDATE convertables SET {} = ?, updated_at = ? WHERE id = ?",
        profile.column()
    );

    let affected = conn
        .execute(&sql, params![path, Utc::now().to_rfc3339(), id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;

    if affected == 0 {
        return Err(Error::not_found("convertables"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::videos;

    #[test]
    fn test_get_or_create_is_idempotent() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let video = videos::create_video(&conn, "Movie", Some("/u/movie.mp4")).unwrap();

        let first = get_or_create(&conn, video.id).unwrap();
        let second = get_or_create(&conn, video.id).unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.available_profiles().is_empty());
    }

    #[test]
    fn test_get_or_create_missing_video() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let err = get_or_create(&conn, VideoId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_field_touches_one_column() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let video = videos::create_video(&conn, "Movie", Some("/u/movie.mp4")).unwrap();
        let record = get_or_create(&conn, video.id).unwrap();

        update_field(&conn, record.id, RenditionProfile::P720, "/u/movie_720p.mp4").unwrap();
        update_field(&conn, record.id, RenditionProfile::P120, "/u/movie_120p.mp4").unwrap();

        let record = get(&conn, record.id).unwrap().unwrap();
        assert_eq!(record.video_720p.as_deref(), Some("/u/movie_720p.mp4"));
        assert_eq!(record.video_120p.as_deref(), Some("/u/movie_120p.mp4"));
        assert_eq!(record.video_360p, None);
        assert_eq!(record.video_1080p, None);
    }

    #[test]
    fn test_update_field_after_delete() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let video = videos::create_video(&conn, "Movie", Some("/u/movie.mp4")).unwrap();
        let record = get_or_create(&conn, video.id).unwrap();

        videos::delete_video(&conn, video.id).unwrap();

        let err = update_field(&conn, record.id, RenditionProfile::P360, "x").unwrap_err();
        assert!(err.is_not_found());
        assert!(get_for_video(&conn, video.id).unwrap().is_none());
    }
}
