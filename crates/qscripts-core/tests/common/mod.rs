// Shared helpers for qscripts-core integration tests

#![allow(dead_code)]

use qscripts_core::{LanguageError, LanguageRegistry, ScriptLanguage};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Something the host language was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Eval(String),
    Run(PathBuf),
    Function(String),
}

/// In-memory language that records every request
#[derive(Clone, Default)]
pub struct RecordingLanguage {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail_eval: bool,
    pub fail_compile: bool,
    pub entry: Option<String>,
}

impl RecordingLanguage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn runs(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Run(_)))
            .count()
    }

    pub fn registry(&self) -> LanguageRegistry {
        let mut registry = LanguageRegistry::new();
        registry.register(Box::new(self.clone()));
        registry
    }
}

impl ScriptLanguage for RecordingLanguage {
    fn name(&self) -> &str {
        "Recording"
    }

    fn extension(&self) -> &str {
        "py"
    }

    fn evaluate_snippet(&mut self, code: &str) -> Result<(), LanguageError> {
        self.calls.lock().unwrap().push(Call::Eval(code.to_string()));
        if self.fail_eval {
            return Err(LanguageError::Evaluation("NameError".to_string()));
        }
        Ok(())
    }

    fn compile_and_run(&mut self, path: &Path) -> Result<(), LanguageError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Run(path.to_path_buf()));
        if self.fail_compile {
            return Err(LanguageError::Compile("SyntaxError".to_string()));
        }
        Ok(())
    }

    fn call_function(&mut self, name: &str) -> Result<(), LanguageError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Function(name.to_string()));
        Ok(())
    }

    fn entry_function(&self) -> Option<&str> {
        self.entry.as_deref()
    }
}

/// Write `content` to `dir/name`, creating parent directories
pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Move the file's mtime `secs` seconds into the future
pub fn touch(path: &Path, secs: u64) {
    let file = File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file for touching");
    file.set_modified(SystemTime::now() + Duration::from_secs(secs))
        .expect("Failed to set modification time");
}
