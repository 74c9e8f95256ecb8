use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Tracks uploads and reports them once they have stopped changing.
///
/// An upload still being written keeps generating modify events; only a
/// file that stays quiet for the settle duration is handed on.
pub struct FileSettleTracker {
    /// Last time each path changed
    pending: HashMap<PathBuf, Instant>,
    settle_duration: Duration,
}

impl FileSettleTracker {
    pub fn new(settle_duration: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            settle_duration,
        }
    }

    /// Record that a file was created or modified
    pub fn file_changed(&mut self, path: PathBuf) {
        self.file_changed_at(path, Instant::now());
    }

    fn file_changed_at(&mut self, path: PathBuf, at: Instant) {
        self.pending.insert(path, at);
    }

    /// Remove and return every path that has been quiet long enough
    pub fn take_settled(&mut self) -> Vec<PathBuf> {
        self.take_settled_at(Instant::now())
    }

    fn take_settled_at(&mut self, now: Instant) -> Vec<PathBuf> {
        let settle = self.settle_duration;
        let mut settled: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, last_change)| now.saturating_duration_since(**last_change) >= settle)
            .map(|(path, _)| path.clone())
            .collect();

        for path in &settled {
            self.pending.remove(path);
        }
        settled.sort();
        settled
    }

    /// Stop tracking a file (e.g. it was deleted)
    pub fn remove(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
