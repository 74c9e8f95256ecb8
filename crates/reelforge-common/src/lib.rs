//! Reelforge-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across reelforge:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for videos and convertables records
//! - **Rendition profiles**: The closed set of target encodes
//! - **Path Utilities**: Video detection and derived artifact naming
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use reelforge_common::{RenditionProfile, VideoId};
//! use reelforge_common::paths::rendition_path;
//! use std::path::Path;
//!
//! let video_id = VideoId::new();
//! assert_ne!(video_id, VideoId::new());
//!
//! let target = rendition_path(Path::new("/uploads/movie.mp4"), RenditionProfile::P720);
//! assert_eq!(target, Path::new("/uploads/movie_720p.mp4"));
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
