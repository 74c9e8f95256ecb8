//! Rendition encoding and poster frame extraction with ffmpeg.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::{Error, Result};

/// Encoder parameters for one rendition profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// Target size as understood by ffmpeg's `-s` (`"128x96"`, `"hd720"`).
    pub resolution: String,
    /// Video codec passed to `-c:v`.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    /// Constant rate factor.
    #[serde(default = "default_crf")]
    pub crf: u32,
    /// Audio codec passed to `-c:a`.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

impl EncodeSettings {
    /// Settings for `resolution` with the default codec and quality.
    pub fn with_resolution(resolution: impl Into<String>) -> Self {
        Self {
            resolution: resolution.into(),
            video_codec: default_video_codec(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
        }
    }
}

/// Parameters for the poster thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailSettings {
    /// Seconds into the source at which the frame is grabbed.
    #[serde(default = "default_offset_secs")]
    pub offset_secs: f64,
    /// Output width; height follows the source aspect ratio.
    #[serde(default = "default_thumbnail_width")]
    pub width: u32,
    /// WebP quality, 0-100.
    #[serde(default = "default_thumbnail_quality")]
    pub quality: u8,
}

fn default_offset_secs() -> f64 {
    1.0
}

fn default_thumbnail_width() -> u32 {
    320
}

fn default_thumbnail_quality() -> u8 {
    75
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            offset_secs: default_offset_secs(),
            width: default_thumbnail_width(),
            quality: default_thumbnail_quality(),
        }
    }
}

/// Produces derived media from a source file.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode `source` into `output` using `settings`.
    ///
    /// Returns only after the encoder exited successfully and `output` exists.
    async fn encode_rendition(
        &self,
        source: &Path,
        settings: &EncodeSettings,
        output: &Path,
    ) -> Result<()>;

    /// Grab a single still frame from `source` as WebP bytes.
    async fn extract_frame(&self, source: &Path, settings: &ThumbnailSettings) -> Result<Vec<u8>>;
}

/// Build the ffmpeg argument list for one rendition encode.
pub fn rendition_args(input: &Path, settings: &EncodeSettings, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-s".to_string(),
        settings.resolution.clone(),
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-crf".to_string(),
        settings.crf.to_string(),
        "-c:a".to_string(),
        settings.audio_codec.clone(),
        "-strict".to_string(),
        "-2".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Build the ffmpeg argument list that writes one WebP frame to stdout.
pub fn thumbnail_args(input: &Path, settings: &ThumbnailSettings) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        format!("{}", settings.offset_secs),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        format!("scale={}:-2", settings.width),
        "-c:v".to_string(),
        "libwebp".to_string(),
        "-quality".to_string(),
        settings.quality.to_string(),
        "-f".to_string(),
        "webp".to_string(),
        "pipe:1".to_string(),
    ]
}

/// [`Encoder`] backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegEncoder {
    /// Create an encoder that runs `program`, killing any invocation that
    /// outlives `timeout`.
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(PathBuf::from("ffmpeg"), DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode_rendition(
        &self,
        source: &Path,
        settings: &EncodeSettings,
        output: &Path,
    ) -> Result<()> {
        if !source.exists() {
            return Err(Error::file_not_found(source));
        }

        ToolCommand::new(self.program.clone())
            .args(rendition_args(source, settings, output))
            .timeout(self.timeout)
            .execute()
            .await?;

        // A zero exit without an output file is still a failed encode.
        if !output.exists() {
            return Err(Error::tool_failed(
                "ffmpeg",
                format!("exited successfully but produced no file at {}", output.display()),
            ));
        }

        Ok(())
    }

    async fn extract_frame(&self, source: &Path, settings: &ThumbnailSettings) -> Result<Vec<u8>> {
        if !source.exists() {
            return Err(Error::file_not_found(source));
        }

        let output = ToolCommand::new(self.program.clone())
            .args(thumbnail_args(source, settings))
            .timeout(self.timeout)
            .execute()
            .await?;

        if output.stdout.is_empty() {
            return Err(Error::tool_failed("ffmpeg", "no frame produced"));
        }

        Ok(output.stdout)
    }
}
