//! Reelforge - video transcoding pipeline for a media library
//!
//! This library crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod pipeline;
pub mod service;
pub mod watch;
