use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Where qscripts keeps its settings and logs
///
/// On macOS and Linux:
/// - Config: $XDG_CONFIG_HOME/{name} (default: ~/.config/{name})
/// - Data: $XDG_DATA_HOME/{name} (default: ~/.local/share/{name})
///
/// On Windows the known folders from `directories` are used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl ProjectPaths {
    /// Paths for the given application name, or `None` without a home directory
    #[cfg(target_os = "windows")]
    pub fn new(name: &str) -> Option<Self> {
        let dirs = directories::ProjectDirs::from("", "", name)?;
        Some(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        })
    }

    /// Paths for the given application name, or `None` without a home directory
    #[cfg(not(target_os = "windows"))]
    pub fn new(name: &str) -> Option<Self> {
        let home = directories::BaseDirs::new()?.home_dir().to_path_buf();
        Some(Self {
            config_dir: xdg_dir(std::env::var_os("XDG_CONFIG_HOME"), &home, ".config").join(name),
            data_dir: xdg_dir(std::env::var_os("XDG_DATA_HOME"), &home, ".local/share").join(name),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// An XDG base directory: the variable if it holds an absolute path, else `home/fallback`
#[cfg_attr(target_os = "windows", allow(dead_code))]
fn xdg_dir(value: Option<OsString>, home: &Path, fallback: &str) -> PathBuf {
    value
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .unwrap_or_else(|| home.join(fallback))
}
