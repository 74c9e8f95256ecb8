use reelforge_av::{EncodeSettings, ThumbnailSettings};
use reelforge_common::RenditionProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub profiles: ProfilesConfig,

    #[serde(default)]
    pub thumbnail: ThumbnailSettings,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite database file. Relative paths resolve against the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("reelforge.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Number of jobs that may run at the same time.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Jobs that may wait for a worker before submission applies backpressure.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound on a single probe or encoder invocation.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_job_timeout() -> u64 {
    3600
}

impl PipelineConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            job_timeout_secs: default_job_timeout(),
        }
    }
}

/// Encoder settings for every rendition profile.
///
/// Loaded once and shared read-only with the dispatcher.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfilesConfig {
    #[serde(rename = "120p", default = "default_p120")]
    pub p120: EncodeSettings,

    #[serde(rename = "360p", default = "default_p360")]
    pub p360: EncodeSettings,

    #[serde(rename = "720p", default = "default_p720")]
    pub p720: EncodeSettings,

    #[serde(rename = "1080p", default = "default_p1080")]
    pub p1080: EncodeSettings,
}

fn default_p120() -> EncodeSettings {
    EncodeSettings::with_resolution("128x96")
}

fn default_p360() -> EncodeSettings {
    EncodeSettings::with_resolution("352x480")
}

fn default_p720() -> EncodeSettings {
    EncodeSettings::with_resolution("hd720")
}

fn default_p1080() -> EncodeSettings {
    EncodeSettings::with_resolution("hd1080")
}

impl ProfilesConfig {
    pub fn settings(&self, profile: RenditionProfile) -> &EncodeSettings {
        match profile {
            RenditionProfile::P120 => &self.p120,
            RenditionProfile::P360 => &self.p360,
            RenditionProfile::P720 => &self.p720,
            RenditionProfile::P1080 => &self.p1080,
        }
    }
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            p120: default_p120(),
            p360: default_p360(),
            p720: default_p720(),
            p1080: default_p1080(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Upload directories to watch for new source files.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    #[serde(default = "default_settle_time")]
    pub settle_time_secs: u64,

    /// Accepted extensions; empty means the built-in video list.
    #[serde(default)]
    pub extensions: Vec<String>,
}

fn default_settle_time() -> u64 {
    30
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            paths: Vec::new(),
            settle_time_secs: default_settle_time(),
            extensions: Vec::new(),
        }
    }
}
