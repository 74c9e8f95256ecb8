//! Upload directory watcher.
//!
//! New video files dropped into a watched directory are registered with the
//! catalog once they settle, which in turn triggers the pipeline.

pub mod settle;

pub use settle::FileSettleTracker;

use crate::catalog::Catalog;
use crate::config::WatchConfig;
use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use reelforge_common::paths::{derived_source_stem, is_video_file};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How often pending uploads are checked for having settled
const SETTLE_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Watches upload directories and registers new source videos
pub struct FileWatcher {
    config: WatchConfig,
    catalog: Catalog,
    watcher: Option<RecommendedWatcher>,
}

impl FileWatcher {
    pub fn new(config: WatchConfig, catalog: Catalog) -> Self {
        Self {
            config,
            catalog,
            watcher: None,
        }
    }

    /// Start watching configured directories.
    ///
    /// Returns `None` when watching is disabled or nothing could be watched.
    pub fn start(&mut self, cancel: CancellationToken) -> Result<Option<JoinHandle<()>>> {
        if !self.config.enabled {
            tracing::info!("File watcher is disabled");
            return Ok(None);
        }

        if self.config.paths.is_empty() {
            tracing::warn!("No watch paths configured");
            return Ok(None);
        }

        let (event_tx, mut event_rx) = mpsc::channel::<PathBuf>(100);
        let extensions = self.config.extensions.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if event.kind.is_create() || event.kind.is_modify() {
                        for path in event.paths {
                            if is_upload_candidate(&path, &extensions) {
                                let _ = event_tx.blocking_send(path);
                            }
                        }
                    }
                }
            },
            Config::default(),
        )
        .context("Failed to create file watcher")?;

        let mut watching = 0;
        for path in &self.config.paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .with_context(|| format!("Failed to watch path: {:?}", path))?;
                tracing::info!("Watching directory: {:?}", path);
                watching += 1;
            } else {
                tracing::warn!("Watch path does not exist: {:?}", path);
            }
        }

        if watching == 0 {
            return Ok(None);
        }

        self.watcher = Some(watcher);

        let mut tracker =
            FileSettleTracker::new(Duration::from_secs(self.config.settle_time_secs));
        let catalog = self.catalog.clone();

        let handle = tokio::spawn(async move {
            let mut check_interval = tokio::time::interval(SETTLE_CHECK_INTERVAL);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,

                    Some(path) = event_rx.recv() => {
                        tracing::debug!("File event: {:?}", path);
                        tracker.file_changed(path);
                    }

                    _ = check_interval.tick() => {
                        for path in tracker.take_settled() {
                            if path.is_file() {
                                register_upload(&catalog, &path);
                            }
                        }
                    }
                }
            }

            tracing::info!("File watcher stopped");
        });

        Ok(Some(handle))
    }

    /// Stop receiving filesystem events
    pub fn stop(&mut self) {
        self.watcher = None;
    }
}

/// Whether a changed path could be a new source upload.
///
/// Hidden files (including in-progress pipeline outputs) are never uploads.
/// A file named like a derived artifact is skipped only while the source it
/// was derived from sits next to it.
pub fn is_upload_candidate(path: &Path, extensions: &[String]) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'));
    if hidden {
        return false;
    }

    let matches_extension = if extensions.is_empty() {
        is_video_file(path)
    } else {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| extensions.iter().any(|e| e.to_lowercase() == ext))
    };
    if !matches_extension {
        return false;
    }

    if let Some(stem) = derived_source_stem(path) {
        if has_source_sibling(path, stem) {
            tracing::debug!(path = %path.display(), "Skipping derived artifact");
            return false;
        }
    }

    true
}

fn has_source_sibling(path: &Path, stem: &str) -> bool {
    let Some(entries) = path.parent().and_then(|dir| std::fs::read_dir(dir).ok()) else {
        return false;
    };

    entries.flatten().map(|entry| entry.path()).any(|sibling| {
        sibling != path
            && is_video_file(&sibling)
            && sibling.file_stem().and_then(|s| s.to_str()) == Some(stem)
    })
}

/// Create a catalog entry for a settled upload unless one already exists.
pub fn register_upload(catalog: &Catalog, path: &Path) {
    match catalog.find_by_source_path(path) {
        Ok(Some(existing)) => {
            tracing::debug!(video_id = %existing.id, path = %path.display(), "Upload already registered");
            return;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to look up upload");
            return;
        }
    }

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match catalog.create_video(&title, Some(path)) {
        Ok(video) => {
            tracing::info!(video_id = %video.id, path = %path.display(), "Registered upload");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to register upload");
        }
    }
}
