use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(author, version, about = "Video transcoding pipeline for media libraries")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch upload directories and transcode new videos until interrupted
    Start,

    /// Register a video file and run the full pipeline on it
    Process {
        /// Source video file
        #[arg(required = true)]
        file: PathBuf,

        /// Catalog title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,
    },

    /// Re-run the pipeline for an existing video
    Rerun {
        /// Video ID
        video_id: String,
    },

    /// Show a video and its renditions
    Status {
        /// Video ID
        video_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List videos in the catalog
    List,

    /// Probe a media file and display its duration
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
