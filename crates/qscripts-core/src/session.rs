//! The armed script and everything resolved from it

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::file_state::{FileState, FileStatus};

/// One resolved script together with how it should be reloaded
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEntry {
    pub file: FileState,
    /// Unexpanded `/reload` template active when this entry was resolved
    pub reload_command: Option<String>,
    /// Package base active when this entry was resolved
    pub package_base: Option<PathBuf>,
}

impl DependencyEntry {
    pub fn new(file: FileState) -> Self {
        Self {
            file,
            reload_command: None,
            package_base: None,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn has_reload_directive(&self) -> bool {
        self.reload_command.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// The currently active script, its index files and its dependency map
///
/// Dependencies are kept in traversal order so that a tick visits them in the
/// order the index files list them.
#[derive(Debug, Clone)]
pub struct ActiveScriptSession {
    pub main: DependencyEntry,
    pub trigger: Option<FileState>,
    pub keep_trigger: bool,
    /// First entry is the main script's own index file
    pub index_files: Vec<FileState>,
    pub dependencies: IndexMap<PathBuf, DependencyEntry>,
}

impl ActiveScriptSession {
    /// Start a session for `script`, recording its current mtime
    ///
    /// The dependency map is empty until the resolver walks the index files.
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            main: DependencyEntry::new(FileState::observed(script)),
            trigger: None,
            keep_trigger: false,
            index_files: Vec::new(),
            dependencies: IndexMap::new(),
        }
    }

    pub fn script_path(&self) -> &Path {
        self.main.path()
    }

    pub fn is_trigger_based(&self) -> bool {
        self.trigger.is_some()
    }

    /// The tracked entry for `path`, if it is a dependency of this session
    pub fn dependency(&self, path: &Path) -> Option<&DependencyEntry> {
        self.dependencies.get(path)
    }

    /// Forget everything the resolver produced
    pub fn clear_resolution(&mut self) {
        self.dependencies.clear();
        self.index_files.clear();
        self.trigger = None;
        self.keep_trigger = false;
    }

    /// Status of the first index file that is not unchanged
    ///
    /// Stops at the first `Modified` or `NotFound`, so later index files keep
    /// their stored mtime until the dependency map is rebuilt.
    pub fn is_any_index_modified(&mut self, update: bool) -> FileStatus {
        for index in &mut self.index_files {
            let status = index.status(update);
            if status != FileStatus::NotModified {
                return status;
            }
        }
        FileStatus::NotModified
    }

    /// Make the main script and every dependency read as `Modified` once
    ///
    /// Index files are left alone.
    pub fn invalidate_all(&mut self) {
        self.main.file.invalidate();
        for entry in self.dependencies.values_mut() {
            entry.file.invalidate();
        }
    }
}
