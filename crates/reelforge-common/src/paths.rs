//! Path utilities for video detection and derived artifact naming.
//!
//! Derived artifacts live next to their source: for `name.ext` the rendition
//! for profile `P` is `name_P.mp4` and the poster is `name_thumb.webp`. The
//! names depend only on the source path and profile, which is what lets a
//! repeated run find work it already finished.

use crate::RenditionProfile;
use std::path::{Path, PathBuf};

/// List of supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "ts", "webm", "mov", "wmv", "flv",
];

/// Suffix appended to the source stem for the poster thumbnail.
const THUMBNAIL_SUFFIX: &str = "thumb";

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelforge_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("movie.mkv")));
/// assert!(is_video_file(Path::new("/path/to/video.MP4")));
/// assert!(!is_video_file(Path::new("poster.webp")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Path of the rendition `profile` derived from `source`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelforge_common::{paths::rendition_path, RenditionProfile};
///
/// let out = rendition_path(Path::new("/media/movie.mkv"), RenditionProfile::P120);
/// assert_eq!(out, Path::new("/media/movie_120p.mp4"));
/// ```
pub fn rendition_path(source: &Path, profile: RenditionProfile) -> PathBuf {
    derived_path(source, profile.label(), "mp4")
}

/// Path of the poster thumbnail derived from `source`.
pub fn thumbnail_path(source: &Path) -> PathBuf {
    derived_path(source, THUMBNAIL_SUFFIX, "webp")
}

/// Stem of the source a derived artifact name points back to.
///
/// `movie_720p.mp4` and `movie_thumb.webp` both yield `movie`. A real upload
/// can share the pattern (`trailer_720p.mp4`), so callers that need certainty
/// also check that the source exists.
pub fn derived_source_stem(path: &Path) -> Option<&str> {
    let stem = path.file_stem().and_then(|s| s.to_str())?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let base = match ext.as_str() {
        "mp4" => RenditionProfile::ALL
            .iter()
            .find_map(|p| stem.strip_suffix(&format!("_{}", p.label()))),
        "webp" => stem.strip_suffix(&format!("_{}", THUMBNAIL_SUFFIX)),
        _ => None,
    };
    base.filter(|b| !b.is_empty())
}

fn derived_path(source: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{}_{}.{}", stem, suffix, extension);

    match source.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
