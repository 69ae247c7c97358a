//! Per-run working directories and their removal.
//!
//! Every run gets its own `<work_root>/.video2pdf-run-XXXXXX/` root holding a
//! `downloads/` directory for the acquired video and a `frames/` directory for
//! the sample set. Concurrent runs sharing a work root therefore never see
//! each other's files.
//!
//! Removal is best effort: a directory that is already gone counts as removed,
//! and any other failure becomes a [`CleanupWarning`] instead of an error.
//!
//! A [`RunGuard`] ties removal to ownership. A run whose future is dropped
//! (client disconnect, caller timeout) still loses its working directories
//! once the last stage holding the guard lets go of it.

use crate::error::{CleanupWarning, Video2PdfError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

const RUN_PREFIX: &str = ".video2pdf-run-";

/// Working directories of one run.
#[derive(Debug, Clone)]
pub struct WorkDirs {
    /// Unique per-run root.
    pub root: PathBuf,
    /// Acquisition output.
    pub downloads: PathBuf,
    /// Frame sample set.
    pub frames: PathBuf,
}

impl WorkDirs {
    /// Create a fresh per-run root under `work_root`.
    ///
    /// Only the root exists afterwards; `downloads/` and `frames/` are created
    /// by the stages that write into them.
    pub fn create(work_root: &Path) -> Result<Self, Video2PdfError> {
        std::fs::create_dir_all(work_root).map_err(|e| Video2PdfError::OutputWriteFailed {
            path: work_root.to_path_buf(),
            source: e,
        })?;
        let root = tempfile::Builder::new()
            .prefix(RUN_PREFIX)
            .keep(true)
            .tempdir_in(work_root)
            .map_err(|e| Video2PdfError::OutputWriteFailed {
                path: work_root.to_path_buf(),
                source: e,
            })?
            .path()
            .to_path_buf();
        debug!("Working directory: {}", root.display());
        Ok(Self::at(root))
    }

    /// Layout rooted at an existing directory.
    pub fn at(root: PathBuf) -> Self {
        Self {
            downloads: root.join("downloads"),
            frames: root.join("frames"),
            root,
        }
    }
}

/// Remove one directory tree. A missing directory is not an error.
pub fn remove_dir(path: &Path) -> Result<(), CleanupWarning> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CleanupWarning {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Remove the acquisition and sampler directories, then the run root.
///
/// Returns the directories that could not be removed. Calling this twice is
/// harmless.
pub fn cleanup(dirs: &WorkDirs) -> Vec<CleanupWarning> {
    let mut warnings = Vec::new();
    for dir in [&dirs.downloads, &dirs.frames, &dirs.root] {
        if let Err(w) = remove_dir(dir) {
            warn!("Could not remove {}: {}", w.path.display(), w.detail);
            warnings.push(w);
        }
    }
    if warnings.is_empty() {
        info!("Cleaned up {}", dirs.root.display());
    }
    warnings
}

/// Owns a run's working directories and removes them on drop.
///
/// Share it with `Arc` across the stages of a run; removal happens exactly
/// once, either through [`RunGuard::cleanup_now`] or when the last handle is
/// dropped.
#[derive(Debug)]
pub struct RunGuard {
    dirs: WorkDirs,
    armed: AtomicBool,
}

impl RunGuard {
    /// Guard `dirs`. With `keep` set nothing is ever removed.
    pub fn new(dirs: WorkDirs, keep: bool) -> Self {
        Self {
            dirs,
            armed: AtomicBool::new(!keep),
        }
    }

    pub fn dirs(&self) -> &WorkDirs {
        &self.dirs
    }

    /// Remove the directories now and disarm the guard.
    ///
    /// Returns no warnings when the guard was already disarmed.
    pub fn cleanup_now(&self) -> Vec<CleanupWarning> {
        if self.armed.swap(false, Ordering::SeqCst) {
            cleanup(&self.dirs)
        } else {
            Vec::new()
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if *self.armed.get_mut() {
            debug!("Run dropped before cleanup: {}", self.dirs.root.display());
            cleanup(&self.dirs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_makes_unique_roots_under_work_root() {
        let work = tempfile::tempdir().unwrap();
        let a = WorkDirs::create(work.path()).unwrap();
        let b = WorkDirs::create(work.path()).unwrap();

        assert_ne!(a.root, b.root);
        assert!(a.root.is_dir());
        assert_eq!(a.root.parent(), Some(work.path()));
        assert!(a
            .root
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(RUN_PREFIX));
        assert_eq!(a.downloads, a.root.join("downloads"));
        assert_eq!(a.frames, a.root.join("frames"));
    }

    #[test]
    fn create_makes_missing_work_root() {
        let work = tempfile::tempdir().unwrap();
        let nested = work.path().join("a").join("b");
        let dirs = WorkDirs::create(&nested).unwrap();
        assert!(dirs.root.starts_with(&nested));
    }

    #[test]
    fn removes_everything() {
        let work = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::create(work.path()).unwrap();
        std::fs::create_dir_all(&dirs.downloads).unwrap();
        std::fs::create_dir_all(&dirs.frames).unwrap();
        std::fs::write(dirs.downloads.join("video.mp4"), b"v").unwrap();
        std::fs::write(dirs.frames.join("frame_0000.png"), b"f").unwrap();

        let warnings = cleanup(&dirs);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert!(!dirs.root.exists());
        assert!(work.path().is_dir());
    }

    #[test]
    fn is_idempotent() {
        let work = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::create(work.path()).unwrap();
        assert!(cleanup(&dirs).is_empty());
        assert!(cleanup(&dirs).is_empty());
    }

    #[test]
    fn missing_directories_are_fine() {
        let work = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::at(work.path().join("never-created"));
        assert!(cleanup(&dirs).is_empty());
    }

    #[test]
    fn removal_failure_is_a_warning() {
        let work = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::create(work.path()).unwrap();
        std::fs::create_dir_all(&dirs.downloads).unwrap();
        // A regular file where a directory is expected cannot be removed
        // as a directory tree.
        std::fs::write(&dirs.frames, b"not a directory").unwrap();

        let warnings = cleanup(&dirs);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert_eq!(warnings[0].path, dirs.frames);
        assert!(!warnings[0].detail.is_empty());
        assert!(!dirs.downloads.exists());
    }

    #[test]
    fn guard_removes_on_drop() {
        let work = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::create(work.path()).unwrap();
        std::fs::create_dir_all(&dirs.downloads).unwrap();
        let root = dirs.root.clone();

        drop(RunGuard::new(dirs, false));
        assert!(!root.exists());
    }

    #[test]
    fn guard_cleans_once() {
        let work = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::create(work.path()).unwrap();
        std::fs::write(&dirs.frames, b"x").unwrap();
        let guard = RunGuard::new(dirs, false);

        assert_eq!(guard.cleanup_now().len(), 1);
        assert!(guard.cleanup_now().is_empty());
        std::fs::create_dir_all(&guard.dirs().downloads).unwrap();
        let downloads = guard.dirs().downloads.clone();
        drop(guard);
        assert!(downloads.exists(), "disarmed guard leaves the tree alone");
    }

    #[test]
    fn kept_guard_never_removes() {
        let work = tempfile::tempdir().unwrap();
        let dirs = WorkDirs::create(work.path()).unwrap();
        let root = dirs.root.clone();
        let guard = RunGuard::new(dirs, true);
        assert!(guard.cleanup_now().is_empty());
        drop(guard);
        assert!(root.is_dir());
    }

    #[test]
    fn leaves_unrelated_files_alone() {
        let work = tempfile::tempdir().unwrap();
        let keep = work.path().join("keep.txt");
        std::fs::write(&keep, b"x").unwrap();
        let dirs = WorkDirs::create(work.path()).unwrap();
        cleanup(&dirs);
        assert!(keep.is_file());
    }
}
