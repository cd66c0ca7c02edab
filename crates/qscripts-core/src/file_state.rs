//! Modification-time tracking for a single file
//!
//! A [`FileState`] remembers the last modification time it observed for a path.
//! Re-checking the file classifies it as missing, unchanged or modified. There is
//! no content hashing: two stats with the same mtime are the same file.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Result of re-checking a tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// The file does not exist (or cannot be stat'ed)
    NotFound,
    /// The file exists and its mtime matches the stored one
    NotModified,
    /// The file exists and its mtime differs from the stored one
    Modified,
}

/// Existence and last-known modification time of one file
#[derive(Debug, Clone, Default)]
pub struct FileState {
    path: PathBuf,
    /// `None` means "never seen" or "invalidated"
    modified: Option<SystemTime>,
}

impl FileState {
    /// Track `path` without stat'ing it yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            modified: None,
        }
    }

    /// Track `path` and record its current mtime
    pub fn observed(path: impl Into<PathBuf>) -> Self {
        let mut state = Self::new(path);
        state.refresh();
        state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn exists(&self) -> bool {
        modification_time(&self.path).is_some()
    }

    /// Stat the file and store its mtime. Returns whether the file exists.
    ///
    /// A missing file leaves the stored mtime untouched.
    pub fn refresh(&mut self) -> bool {
        match modification_time(&self.path) {
            Some(mtime) => {
                self.modified = Some(mtime);
                true
            }
            None => false,
        }
    }

    /// Point this state at another path and refresh it
    pub fn refresh_path(&mut self, path: impl Into<PathBuf>) -> bool {
        self.path = path.into();
        self.modified = None;
        self.refresh()
    }

    /// Compare a fresh stat against the stored mtime
    ///
    /// With `update`, a modified file stores its new mtime and a missing file
    /// forgets the stored one, so that its reappearance reads as `Modified`.
    pub fn status(&mut self, update: bool) -> FileStatus {
        let Some(current) = modification_time(&self.path) else {
            if update {
                self.modified = None;
            }
            return FileStatus::NotFound;
        };

        if self.modified == Some(current) {
            return FileStatus::NotModified;
        }

        debug!(
            target: "qscripts",
            "File changed: {} (old: {:?}, new: {:?})",
            self.path.display(),
            self.modified,
            current
        );

        if update {
            self.modified = Some(current);
        }
        FileStatus::Modified
    }

    /// Force the next [`status`](Self::status) call to report `Modified`
    pub fn invalidate(&mut self) {
        self.modified = None;
    }
}

impl PartialEq for FileState {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileState {}

/// Modification time of `path`, or `None` when it cannot be read
pub fn modification_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, secs_from_now: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(secs_from_now))
            .unwrap();
    }

    #[test]
    fn test_refresh_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = FileState::new(temp_dir.path().join("missing.py"));

        assert!(!state.refresh());
        assert!(state.last_modified().is_none());
        assert_eq!(state.status(true), FileStatus::NotFound);
    }

    #[test]
    fn test_status_not_modified_after_refresh() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("script.py");
        fs::write(&path, "print(1)").unwrap();

        let mut state = FileState::observed(&path);
        assert_eq!(state.status(true), FileStatus::NotModified);
        assert_eq!(state.status(true), FileStatus::NotModified);
    }

    #[test]
    fn test_status_detects_and_records_change() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("script.py");
        fs::write(&path, "print(1)").unwrap();

        let mut state = FileState::observed(&path);
        set_mtime(&path, 10);

        assert_eq!(state.status(true), FileStatus::Modified);
        // The new mtime was stored
        assert_eq!(state.status(true), FileStatus::NotModified);
    }

    #[test]
    fn test_status_without_update_keeps_reporting() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("script.py");
        fs::write(&path, "print(1)").unwrap();

        let mut state = FileState::observed(&path);
        set_mtime(&path, 10);

        assert_eq!(state.status(false), FileStatus::Modified);
        assert_eq!(state.status(false), FileStatus::Modified);
        assert_eq!(state.status(true), FileStatus::Modified);
        assert_eq!(state.status(false), FileStatus::NotModified);
    }

    #[test]
    fn test_invalidate_forces_one_modified() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("script.py");
        fs::write(&path, "print(1)").unwrap();

        let mut state = FileState::observed(&path);
        state.invalidate();

        assert_eq!(state.status(true), FileStatus::Modified);
        assert_eq!(state.status(true), FileStatus::NotModified);
    }

    #[test]
    fn test_reappearing_file_reads_as_modified() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("go.trigger");
        fs::write(&path, "").unwrap();

        let mut state = FileState::observed(&path);
        fs::remove_file(&path).unwrap();
        assert_eq!(state.status(true), FileStatus::NotFound);

        fs::write(&path, "").unwrap();
        assert_eq!(state.status(true), FileStatus::Modified);
    }

    #[test]
    fn test_equality_ignores_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("script.py");
        fs::write(&path, "print(1)").unwrap();

        let seen = FileState::observed(&path);
        let unseen = FileState::new(&path);
        assert_eq!(seen, unseen);
        assert_ne!(seen, FileState::new(temp_dir.path().join("other.py")));
    }

    #[test]
    fn test_refresh_path_retargets() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("old.py");
        let new = temp_dir.path().join("new.py");
        fs::write(&old, "").unwrap();

        let mut state = FileState::observed(&old);
        assert!(state.exists());

        assert!(!state.refresh_path(&new));
        assert_eq!(state.path(), new.as_path());
        assert!(!state.exists());
        assert!(state.last_modified().is_none());

        fs::write(&new, "").unwrap();
        assert!(state.refresh_path(&new));
        assert_eq!(state.status(true), FileStatus::NotModified);
    }
}
