//! # reelforge-av
//!
//! External tool plumbing for the transcoding pipeline.
//!
//! This crate provides functionality for:
//! - Probing a source file's duration with ffprobe
//! - Encoding resolution-specific renditions with ffmpeg
//! - Extracting a poster frame straight into memory
//! - Staging outputs next to their destination and renaming only on success
//!
//! The pixel work itself is always delegated to the external binaries. The
//! [`MediaProbe`] and [`Encoder`] traits are the seams the pipeline depends on,
//! so callers can substitute their own implementations.
//!
//! ## Example
//!
//! ```no_run
//! use reelforge_av::{FfprobeProbe, MediaProbe};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), reelforge_av::ProbeError> {
//! let probe = FfprobeProbe::default();
//! let seconds = probe.duration(Path::new("/uploads/movie.mp4")).await?;
//! println!("duration: {seconds}s");
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod encode;
mod error;
pub mod probe;
pub mod staging;
pub mod tools;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use encode::{EncodeSettings, Encoder, FfmpegEncoder, ThumbnailSettings};
pub use error::{Error, Result};
pub use probe::{parse_duration, FfprobeProbe, MediaProbe, ProbeError};
pub use staging::StagedFile;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
