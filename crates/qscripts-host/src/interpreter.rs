//! Script languages backed by interpreter processes
//!
//! Every run spawns the interpreter with the terminal's stdio, so nothing
//! survives between runs. Calling a function therefore needs a `call` snippet
//! that loads the script and invokes it; without one `call_function` reports
//! the language as unsupported and the unload hook is skipped.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use qscripts_core::{LanguageError, LanguageRegistry, ScriptLanguage};
use tracing::debug;

use crate::config::{LanguageConfig, QScriptsConfig};

#[derive(Debug, Clone)]
pub struct ExternalInterpreter {
    extension: String,
    config: LanguageConfig,
    /// Script that ran last, used to fill `{script}` in the call snippet
    last_script: Option<PathBuf>,
}

impl ExternalInterpreter {
    pub fn new(extension: impl Into<String>, config: LanguageConfig) -> Self {
        Self {
            extension: extension.into(),
            config,
            last_script: None,
        }
    }

    fn spawn(&self, args: &[String], last: &OsStr) -> Result<()> {
        debug!(
            target: "qscripts",
            "Spawning {} {:?} {}",
            self.config.program,
            args,
            last.to_string_lossy()
        );
        let status = Command::new(&self.config.program)
            .args(args)
            .arg(last)
            .status()
            .with_context(|| format!("Failed to start {}", self.config.program))?;

        if !status.success() {
            return Err(anyhow!("{} exited with {}", self.config.program, status));
        }
        Ok(())
    }
}

impl ScriptLanguage for ExternalInterpreter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn evaluate_snippet(&mut self, code: &str) -> Result<(), LanguageError> {
        self.spawn(&self.config.eval_args, OsStr::new(code))
            .map_err(|e| LanguageError::Evaluation(format!("{:#}", e)))
    }

    fn compile_and_run(&mut self, path: &Path) -> Result<(), LanguageError> {
        self.last_script = Some(path.to_path_buf());
        self.spawn(&self.config.args, path.as_os_str())
            .map_err(|e| LanguageError::Runtime(format!("{:#}", e)))
    }

    fn call_function(&mut self, name: &str) -> Result<(), LanguageError> {
        let Some(template) = self.config.call.as_deref() else {
            return Err(LanguageError::Unsupported(format!(
                "{} cannot call functions",
                self.config.name
            )));
        };
        let Some(script) = self.last_script.as_deref() else {
            return Err(LanguageError::FunctionNotFound(name.to_string()));
        };

        let code = template
            .replace("{script}", &script.to_string_lossy())
            .replace("{function}", name);
        self.spawn(&self.config.eval_args, OsStr::new(&code))
            .map_err(|e| LanguageError::Runtime(format!("{:#}", e)))
    }

    fn entry_function(&self) -> Option<&str> {
        self.config.entry.as_deref()
    }
}

/// One interpreter per configured extension, built-ins included
pub fn build_registry(config: &QScriptsConfig) -> LanguageRegistry {
    let mut registry = LanguageRegistry::new();
    for (ext, language) in config.language_configs() {
        registry.register(Box::new(ExternalInterpreter::new(ext, language)));
    }
    registry
}
