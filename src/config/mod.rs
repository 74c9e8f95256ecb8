mod types;

pub use types::*;

use anyhow::{Context, Result};
use reelforge_common::RenditionProfile;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./reelforge.toml",
        "./config.toml",
        "~/.config/reelforge/config.toml",
        "/etc/reelforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading config");
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.pipeline.workers == 0 {
        anyhow::bail!("pipeline.workers must be at least 1");
    }

    if config.pipeline.queue_capacity == 0 {
        anyhow::bail!("pipeline.queue_capacity must be at least 1");
    }

    if config.pipeline.job_timeout_secs == 0 {
        anyhow::bail!("pipeline.job_timeout_secs must be at least 1");
    }

    for profile in RenditionProfile::ALL {
        let settings = config.profiles.settings(profile);
        if settings.resolution.trim().is_empty() {
            anyhow::bail!("Profile '{}' has no resolution", profile);
        }
        if settings.crf > 51 {
            anyhow::bail!("Profile '{}' crf {} is out of range 0-51", profile, settings.crf);
        }
    }

    if config.thumbnail.quality > 100 {
        anyhow::bail!(
            "thumbnail.quality {} is out of range 0-100",
            config.thumbnail.quality
        );
    }

    if config.thumbnail.offset_secs < 0.0 {
        anyhow::bail!("thumbnail.offset_secs cannot be negative");
    }

    for path in &config.watch.paths {
        if !path.exists() {
            tracing::warn!("Watch path does not exist: {:?}", path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_encodes() {
        let config = parse_config("").unwrap();

        assert_eq!(config.profiles.settings(RenditionProfile::P120).resolution, "128x96");
        assert_eq!(config.profiles.settings(RenditionProfile::P360).resolution, "352x480");
        assert_eq!(config.profiles.settings(RenditionProfile::P720).resolution, "hd720");
        assert_eq!(config.profiles.settings(RenditionProfile::P1080).resolution, "hd1080");
        for profile in RenditionProfile::ALL {
            let settings = config.profiles.settings(profile);
            assert_eq!(settings.video_codec, "libx264");
            assert_eq!(settings.crf, 23);
            assert_eq!(settings.audio_codec, "aac");
        }
        assert_eq!(config.pipeline.job_timeout_secs, 3600);
        assert_eq!(config.thumbnail.width, 320);
    }

    #[test]
    fn test_profile_override() {
        let config = parse_config(
            r#"
            [pipeline]
            workers = 4

            [profiles.720p]
            resolution = "1280x720"
            crf = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.workers, 4);
        let p720 = config.profiles.settings(RenditionProfile::P720);
        assert_eq!(p720.resolution, "1280x720");
        assert_eq!(p720.crf, 20);
        assert_eq!(p720.video_codec, "libx264");
        assert_eq!(config.profiles.settings(RenditionProfile::P1080).resolution, "hd1080");
    }

    #[test]
    fn test_rejects_zero_workers() {
        let err = parse_config("[pipeline]\nworkers = 0\n").unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_rejects_bad_crf() {
        assert!(parse_config("[profiles.120p]\nresolution = \"128x96\"\ncrf = 80\n").is_err());
    }

    #[test]
    fn test_rejects_empty_resolution() {
        assert!(parse_config("[profiles.360p]\nresolution = \" \"\n").is_err());
    }

    #[test]
    fn test_rejects_bad_thumbnail_quality() {
        assert!(parse_config("[thumbnail]\nquality = 101\n").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"/var/lib/reelforge/db.sqlite\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.database.path,
            std::path::PathBuf::from("/var/lib/reelforge/db.sqlite")
        );
    }
}
