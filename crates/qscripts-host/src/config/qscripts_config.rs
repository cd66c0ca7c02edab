use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use qscripts_core::MonitorOptions;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::paths::ProjectPaths;

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found")]
    NotFound,
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("IO error reading config: {0}")]
    IoError(String),
}

/// Persisted settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QScriptsConfig {
    /// Script activated most recently
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_script: Option<PathBuf>,

    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Interpreters by file extension, merged over the built-in ones
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Poll interval in milliseconds (default: 500ms, never below 300ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Clear the terminal before each run
    #[serde(default)]
    pub clear_log: bool,

    /// Log the name of each script as it runs
    #[serde(default)]
    pub show_filename: bool,

    /// Call `__quick_unload_script` before re-running
    #[serde(default)]
    pub exec_unload_func: bool,
}

fn default_interval_ms() -> u64 {
    500
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            clear_log: false,
            show_filename: false,
            exec_unload_func: false,
        }
    }
}

impl MonitorConfig {
    pub fn options(&self) -> MonitorOptions {
        MonitorOptions {
            interval: Duration::from_millis(self.interval_ms),
            clear_output: self.clear_log,
            show_filename: self.show_filename,
            exec_unload_func: self.exec_unload_func,
        }
        .normalized()
    }
}

/// An interpreter program used to run scripts with one extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    pub program: String,

    /// Arguments placed before the script path
    #[serde(default)]
    pub args: Vec<String>,

    /// Arguments placed before a code snippet (e.g. `-c`)
    #[serde(default)]
    pub eval_args: Vec<String>,

    /// Snippet run to call a function, with `{script}` and `{function}` filled in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,

    /// Function to call after every successful run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

impl LanguageConfig {
    fn builtin(name: &str, program: &str, eval_flag: &str) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: Vec::new(),
            eval_args: vec![eval_flag.to_string()],
            call: None,
            entry: None,
        }
    }
}

/// Interpreters available without any configuration
pub fn default_languages() -> BTreeMap<String, LanguageConfig> {
    [
        ("py", LanguageConfig::builtin("Python", "python3", "-c")),
        ("sh", LanguageConfig::builtin("Shell", "sh", "-c")),
        ("js", LanguageConfig::builtin("JavaScript", "node", "-e")),
        ("lua", LanguageConfig::builtin("Lua", "lua", "-e")),
        ("rb", LanguageConfig::builtin("Ruby", "ruby", "-e")),
        ("pl", LanguageConfig::builtin("Perl", "perl", "-e")),
    ]
    .into_iter()
    .map(|(ext, language)| (ext.to_string(), language))
    .collect()
}

impl QScriptsConfig {
    pub fn config_path() -> PathBuf {
        ProjectPaths::new("qscripts")
            .map(|p| p.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".qscripts").join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound);
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let config =
            toml::from_str(&content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Built-in interpreters with configured ones layered on top
    pub fn language_configs(&self) -> BTreeMap<String, LanguageConfig> {
        let mut languages = default_languages();
        for (ext, language) in &self.languages {
            languages.insert(ext.to_ascii_lowercase(), language.clone());
        }
        languages
    }
}
