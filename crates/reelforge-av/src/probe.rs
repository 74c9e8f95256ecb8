//! FFprobe-based duration probing.
//!
//! Only the `duration` of the first video stream is read. Duration is a
//! prerequisite for a pipeline run rather than an artifact of it, so errors
//! here are reported to the caller instead of being retried.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::Error;

/// Why a source file could not be probed.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The source path does not exist.
    #[error("source not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The probe tool could not be run or exited non-zero.
    #[error("probe tool failed: {0}")]
    ToolFailure(String),

    /// The tool's output lacked the expected fields.
    #[error("failed to parse probe output: {0}")]
    ParseFailure(String),
}

/// Extracts playback metadata from a source file.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Human-readable name identifying this probe implementation.
    fn name(&self) -> &'static str;

    /// Duration of the first video stream, in seconds.
    async fn duration(&self, source: &Path) -> Result<f64, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    duration: Option<serde_json::Value>,
}

/// Parse ffprobe's JSON stream listing and return the first stream's duration.
///
/// ffprobe reports durations as strings (`"97.500000"`); bare numbers are
/// accepted too.
pub fn parse_duration(json: &str) -> Result<f64, ProbeError> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| ProbeError::ParseFailure(format!("invalid JSON: {e}")))?;

    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| ProbeError::ParseFailure("no video stream".to_string()))?;

    let seconds = match stream.duration {
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| ProbeError::ParseFailure("missing stream duration".to_string()))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ProbeError::ParseFailure(format!(
            "invalid duration: {seconds}"
        )));
    }

    Ok(seconds)
}

/// [`MediaProbe`] backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    /// Create a probe that runs `program` with the given timeout.
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    fn command(&self, source: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.args([
            "-v",
            "quiet",
            "-show_streams",
            "-select_streams",
            "v:0",
            "-of",
            "json",
        ])
        .arg(source.to_string_lossy())
        .timeout(self.timeout);
        cmd
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new(PathBuf::from("ffprobe"), DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn duration(&self, source: &Path) -> Result<f64, ProbeError> {
        if !source.exists() {
            return Err(ProbeError::NotFound {
                path: source.to_path_buf(),
            });
        }

        let output = self.command(source).execute().await.map_err(|e| match e {
            Error::ToolFailed { message, .. } => ProbeError::ToolFailure(message),
            other => ProbeError::ToolFailure(other.to_string()),
        })?;

        parse_duration(&output.stdout_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FFPROBE_STREAM: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "24/1",
                "duration": "97.500000"
            }
        ]
    }"#;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration(FFPROBE_STREAM).unwrap(), 97.5);
    }

    #[test]
    fn test_parse_numeric_duration() {
        let json = r#"{"streams": [{"duration": 12.25}]}"#;
        assert_eq!(parse_duration(json).unwrap(), 12.25);
    }

    #[test]
    fn test_parse_missing_duration() {
        let json = r#"{"streams": [{"codec_type": "video"}]}"#;
        assert!(matches!(
            parse_duration(json),
            Err(ProbeError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_parse_no_streams() {
        assert!(matches!(
            parse_duration(r#"{"streams": []}"#),
            Err(ProbeError::ParseFailure(_))
        ));
        assert!(matches!(parse_duration("{}"), Err(ProbeError::ParseFailure(_))));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_duration("not json"),
            Err(ProbeError::ParseFailure(_))
        ));
        let json = r#"{"streams": [{"duration": "N/A"}]}"#;
        assert!(matches!(parse_duration(json), Err(ProbeError::ParseFailure(_))));
    }

    #[test]
    fn test_command_selects_first_video_stream() {
        let probe = FfprobeProbe::default();
        let cmd = probe.command(Path::new("/uploads/movie.mp4"));
        let args = cmd.get_args();
        assert!(args.windows(2).any(|w| w == ["-select_streams", "v:0"]));
        assert_eq!(args.last().map(String::as_str), Some("/uploads/movie.mp4"));
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let probe = FfprobeProbe::default();
        let result = probe.duration(Path::new("/definitely/not/here.mp4")).await;
        assert!(matches!(result, Err(ProbeError::NotFound { .. })));
    }
}
