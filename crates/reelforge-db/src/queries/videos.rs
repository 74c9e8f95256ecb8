//! Video catalog queries.
//!
//! The pipeline only touches `duration_secs` and `thumbnail_path`; the rest
//! is written by the catalog.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use reelforge_common::{Error, Result, VideoId};

use super::{timestamp_column, uuid_column};
use crate::models::SourceVideo;

const VIDEO_COLUMNS: &str =
    "id, title, source_path, duration_secs, thumbnail_path, created_at, updated_at";

/// Parse a video from a database row.
///
/// Expects columns in [`VIDEO_COLUMNS`] order.
fn parse_video_row(row: &rusqlite::Row) -> rusqlite::Result<SourceVideo> {
    Ok(SourceVideo {
        id: VideoId::from(uuid_column(row, 0)?),
        title: row.get(1)?,
        source_path: row.get(2)?,
        duration_secs: row.get(3)?,
        thumbnail_path: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

/// Create a new video.
pub fn create_video(
    conn: &Connection,
    title: &str,
    source_path: Option<&str>,
) -> Result<SourceVideo> {
    let id = VideoId::new();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO videos (id, title, source_path, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        params![
            id.to_string(),
            title,
            source_path,
            now.to_rfc3339(),
            now.to_rfc3339()
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(SourceVideo {
        id,
        title: title.to_string(),
        source_path: source_path.map(str::to_string),
        duration_secs: None,
        thumbnail_path: None,
        created_at: now,
        updated_at: now,
    })
}

/// Get a video by ID.
pub fn get_video(conn: &Connection, id: VideoId) -> Result<Option<SourceVideo>> {
    conn.query_row(
        &format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"),
        [id.to_string()],
        parse_video_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Find the video whose source is `source_path`.
pub fn find_by_source_path(conn: &Connection, source_path: &str) -> Result<Option<SourceVideo>> {
    conn.query_row(
        &format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE source_path = ?
             ORDER BY created_at LIMIT 1"
        ),
        [source_path],
        parse_video_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all videos, oldest first.
pub fn list_videos(conn: &Connection) -> Result<Vec<SourceVideo>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY created_at ASC"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let videos = stmt
        .query_map([], parse_video_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(videos)
}

/// Current source path of a video.
///
/// # Errors
///
/// `Error::NotFound` if the video no longer exists.
pub fn source_path(conn: &Connection, id: VideoId) -> Result<Option<String>> {
    conn.query_row(
        "SELECT source_path FROM videos WHERE id = ?",
        [id.to_string()],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))?
    .ok_or_else(|| Error::not_found("video"))
}

/// Update a video's catalog fields, returning the source path it had before.
///
/// The read and the write happen in one transaction so the returned previous
/// path is exactly the value this call replaced.
pub fn update_video(
    conn: &Connection,
    id: VideoId,
    title: &str,
    new_source: Option<&str>,
) -> Result<Option<String>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let previous = source_path(&tx, id)?;

    tx.execute(
        "UPDATE videos SET title = ?, source_path = ?, updated_at = ? WHERE id = ?",
        params![title, new_source, Utc::now().to_rfc3339(), id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(previous)
}

/// Record the probed duration of a video.
pub fn set_duration(conn: &Connection, id: VideoId, duration_secs: f64) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE videos SET duration_secs = ?, updated_at = ? WHERE id = ?",
            params![duration_secs, Utc::now().to_rfc3339(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if affected == 0 {
        return Err(Error::not_found("video"));
    }

    Ok(())
}

/// Record the poster thumbnail of a video.
pub fn set_thumbnail_path(conn: &Connection, id: VideoId, path: &str) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE videos SET thumbnail_path = ?, updated_at = ? WHERE id = ?",
            params![path, Utc::now().to_rfc3339(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if affected == 0 {
        return Err(Error::not_found("video"));
    }

    Ok(())
}

/// Delete a video; its convertables record goes with it.
///
/// Returns whether a row was deleted.
pub fn delete_video(conn: &Connection, id: VideoId) -> Result<bool> {
    let affected = conn
        .execute("DELETE FROM videos WHERE id = ?", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(affected > 0)
}
