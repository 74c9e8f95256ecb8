//! Staged output files with atomic finalization.

use crate::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Mode of finalized outputs. Temp files are created owner-only.
#[cfg(unix)]
const PUBLISHED_MODE: u32 = 0o644;

/// A temporary file created next to its final destination.
///
/// Tools write into [`StagedFile::path`]; only [`StagedFile::finalize`] moves
/// the result onto the destination, with a same-directory rename. A staged
/// file that is dropped without being finalized is deleted, so a failed
/// encode never leaves a partial file at the destination path.
///
/// # Example
///
/// ```no_run
/// use reelforge_av::StagedFile;
///
/// let staged = StagedFile::new("/uploads/movie_720p.mp4")?;
/// // run the encoder against staged.path()
/// staged.finalize()?;
/// # Ok::<(), reelforge_av::Error>(())
/// ```
#[derive(Debug)]
pub struct StagedFile {
    temp: NamedTempFile,
    destination: PathBuf,
}

impl StagedFile {
    /// Stage a file for `destination`.
    ///
    /// The temp file keeps the destination's extension so tools that infer
    /// the container from the file name behave the same way.
    pub fn new<P: AsRef<Path>>(destination: P) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();

        let file_name = destination
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidInput("Invalid destination file path".to_string()))?;
        let dir = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let suffix = destination
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|e| Error::Staging(format!("Failed to stage {:?}: {}", destination, e)))?;

        Ok(Self { temp, destination })
    }

    /// Path tools should write to.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Final path the staged file will be moved to.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Write `bytes` into the staged file.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.temp.write_all(bytes)?;
        self.temp.flush()?;
        Ok(())
    }

    /// Move the staged file onto its destination, replacing any existing file.
    pub fn finalize(self) -> Result<PathBuf> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                self.temp.path(),
                std::fs::Permissions::from_mode(PUBLISHED_MODE),
            )?;
        }

        let destination = self.destination;
        self.temp.persist(&destination).map_err(|e| {
            Error::Staging(format!(
                "Failed to move output to {:?}: {}",
                destination, e.error
            ))
        })?;
        Ok(destination)
    }
}
