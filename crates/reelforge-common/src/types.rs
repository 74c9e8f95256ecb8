//! Core type definitions for the transcoding pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target encode produced for every source video.
///
/// The set is closed: every convertables record has exactly one slot per
/// variant. Serialized using the human label (`"720p"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RenditionProfile {
    #[serde(rename = "120p")]
    P120,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl RenditionProfile {
    /// All profiles, lowest resolution first.
    pub const ALL: [RenditionProfile; 4] = [Self::P120, Self::P360, Self::P720, Self::P1080];

    /// Label used in derived file names and configuration keys.
    pub fn label(self) -> &'static str {
        match self {
            Self::P120 => "120p",
            Self::P360 => "360p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }

    /// Column of the convertables table holding this rendition's path.
    pub fn column(self) -> &'static str {
        match self {
            Self::P120 => "video_120p",
            Self::P360 => "video_360p",
            Self::P720 => "video_720p",
            Self::P1080 => "video_1080p",
        }
    }
}

impl fmt::Display for RenditionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RenditionProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "120p" | "120" => Ok(Self::P120),
            "360p" | "360" => Ok(Self::P360),
            "720p" | "720" => Ok(Self::P720),
            "1080p" | "1080" => Ok(Self::P1080),
            _ => Err(format!("Invalid rendition profile: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let labels: Vec<_> = RenditionProfile::ALL.iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["120p", "360p", "720p", "1080p"]);
    }

    #[test]
    fn test_parse() {
        assert_eq!("720p".parse::<RenditionProfile>().unwrap(), RenditionProfile::P720);
        assert_eq!("1080P".parse::<RenditionProfile>().unwrap(), RenditionProfile::P1080);
        assert_eq!("360".parse::<RenditionProfile>().unwrap(), RenditionProfile::P360);
        assert!("480p".parse::<RenditionProfile>().is_err());
    }

    #[test]
    fn test_columns_are_distinct() {
        let columns: std::collections::HashSet<_> =
            RenditionProfile::ALL.iter().map(|p| p.column()).collect();
        assert_eq!(columns.len(), 4);
    }

    #[test]
    fn test_serde_uses_label() {
        let json = serde_json::to_string(&RenditionProfile::P120).unwrap();
        assert_eq!(json, "\"120p\"");
        let back: RenditionProfile = serde_json::from_str("\"1080p\"").unwrap();
        assert_eq!(back, RenditionProfile::P1080);
    }
}
