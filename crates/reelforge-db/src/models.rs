//! Internal Rust models matching the database schema.

use chrono::{DateTime, Utc};
use reelforge_common::{ConvertablesId, RenditionProfile, VideoId};
use serde::{Deserialize, Serialize};

/// A source video in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceVideo {
    pub id: VideoId,
    pub title: String,
    /// Filesystem path of the original upload, if one has been attached.
    pub source_path: Option<String>,
    /// Seconds; unset until the source has been probed.
    pub duration_secs: Option<f64>,
    /// Poster image derived from the source.
    pub thumbnail_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceVideo {
    /// The source path, treating an empty string as absent.
    pub fn source(&self) -> Option<&str> {
        self.source_path.as_deref().filter(|p| !p.is_empty())
    }
}

/// Which renditions exist for one video, and where.
///
/// An empty slot means "not yet available": the rendition is still being
/// produced, or its job failed and nothing has re-run it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConvertablesRecord {
    pub id: ConvertablesId,
    pub video_id: VideoId,
    pub video_120p: Option<String>,
    pub video_360p: Option<String>,
    pub video_720p: Option<String>,
    pub video_1080p: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConvertablesRecord {
    /// Path recorded for `profile`, if that rendition has completed.
    pub fn rendition(&self, profile: RenditionProfile) -> Option<&str> {
        match profile {
            RenditionProfile::P120 => self.video_120p.as_deref(),
            RenditionProfile::P360 => self.video_360p.as_deref(),
            RenditionProfile::P720 => self.video_720p.as_deref(),
            RenditionProfile::P1080 => self.video_1080p.as_deref(),
        }
    }

    /// Profiles whose rendition is available, lowest resolution first.
    pub fn available_profiles(&self) -> Vec<RenditionProfile> {
        RenditionProfile::ALL
            .into_iter()
            .filter(|p| self.rendition(*p).is_some())
            .collect()
    }

    /// Whether every profile has a rendition.
    pub fn is_complete(&self) -> bool {
        RenditionProfile::ALL
            .iter()
            .all(|p| self.rendition(*p).is_some())
    }
}
