//! Scratch workspace for extracted feed files

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::FilesystemError;

/// Directory owned by one pipeline run.
///
/// [`ScratchWorkspace::remove`] is the success path and reports failures.
/// Dropping the guard without calling it (an earlier stage failed) still
/// removes the directory, logging instead of failing.
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    armed: bool,
}

impl ScratchWorkspace {
    /// Create an empty directory at `path`, clearing leftovers from a crashed run
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, FilesystemError> {
        let path = path.into();

        if path.exists() {
            warn!(path = %path.display(), "Removing leftover scratch directory");
            std::fs::remove_dir_all(&path).map_err(|source| FilesystemError::RemoveScratch {
                path: path.clone(),
                source,
            })?;
        }

        std::fs::create_dir_all(&path).map_err(|source| FilesystemError::CreateScratch {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self { path, armed: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(mut self) -> Result<(), FilesystemError> {
        self.armed = false;
        std::fs::remove_dir_all(&self.path).map_err(|source| FilesystemError::RemoveScratch {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "Removed scratch directory");
        Ok(())
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %err, "Could not clean up scratch directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_remove() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("tmp");

        let scratch = ScratchWorkspace::create(&dir).unwrap();
        assert!(dir.is_dir());
        std::fs::write(scratch.path().join("stops.txt"), "stop_id\n").unwrap();

        scratch.remove().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_leftovers_are_cleared() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("tmp");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("agency.txt"), "stale").unwrap();

        let scratch = ScratchWorkspace::create(&dir).unwrap();
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_cleans_up() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("tmp");

        {
            let scratch = ScratchWorkspace::create(&dir).unwrap();
            std::fs::write(scratch.path().join("trips.txt"), "trip_id\n").unwrap();
        }

        assert!(!dir.exists());
    }

    #[test]
    fn test_remove_reports_failure() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("tmp");

        let scratch = ScratchWorkspace::create(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(
            scratch.remove(),
            Err(FilesystemError::RemoveScratch { .. })
        ));
    }
}
